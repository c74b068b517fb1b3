// ==========================================
// Engine - ingestion orchestrator
// ==========================================
// Responsibility: drive one bulk ingestion run end to end:
//   parse file → normalize columns → validate rows → plan writes →
//   apply per-product transactions → aggregate the report
// Red line: no UI logic; all database access goes through the
// repository; the lookup cache is loaded once and never mutated.
// ==========================================

use crate::engine::planner::BatchPlanner;
use crate::engine::reporter::{RunReport, RunReporter};
use crate::engine::validator::RowValidator;
use crate::engine::writer::{TransactionalWriter, WritePhaseResult};
use crate::importer::error::{IngestError, IngestResult};
use crate::importer::normalizer::ColumnNormalizer;
use crate::importer::file_parser::UniversalFileParser;
use crate::repository::catalog_repo::CatalogRepository;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

// ==========================================
// CatalogIngestor
// ==========================================
/// Bulk catalog ingestion engine.
///
/// # Flow
/// 1. Parse the CSV/Excel file into a raw table
/// 2. Normalize headers into canonical rows
/// 3. Validate every row against the lookup cache
/// 4. Group by sku and compute diff-based write intents
/// 5. Apply one transaction per product (or roll back under dry-run)
/// 6. Aggregate the run report
///
/// Blocking validation errors fail the batch before step 4: the report
/// is still complete (every row validated in one pass) but zero writes
/// are attempted, so a submitter can fix the file and resubmit once.
pub struct CatalogIngestor {
    repo: Arc<dyn CatalogRepository>,
    writer: TransactionalWriter,
}

impl CatalogIngestor {
    pub fn new(repo: Arc<dyn CatalogRepository>) -> Self {
        let writer = TransactionalWriter::new(Arc::clone(&repo));
        Self { repo, writer }
    }

    /// Flag a caller can set to stop the run at the next product
    /// transaction boundary.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.writer.cancel_flag()
    }

    /// Run one ingestion pass over `file_path`.
    ///
    /// # Errors
    /// Only fatal conditions return Err: unreadable/unsupported file
    /// (FormatError family) and an unreachable database. Everything
    /// else lands in the report.
    pub async fn ingest(
        &self,
        file_path: &str,
        operator: Option<&str>,
        dry_run: bool,
    ) -> IngestResult<RunReport> {
        let start_time = std::time::Instant::now();
        let file_name = Path::new(file_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(file_path)
            .to_string();

        tracing::info!(file = %file_name, dry_run, "starting ingestion run");

        // === step 0: fail fast if the store is unreachable ===
        self.repo
            .ensure_ready()
            .await
            .map_err(|e| IngestError::DatabaseConnection(e.to_string()))?;

        // === step 1: parse the file ===
        let table = UniversalFileParser.parse(file_path)?;
        let rows = ColumnNormalizer::new().normalize(&table);
        let rows_read = rows.len();

        // === step 2: build the read-only lookup cache ===
        let cache = self
            .repo
            .load_lookup_cache()
            .await
            .map_err(|e| IngestError::DatabaseConnection(e.to_string()))?;
        tracing::debug!(
            categories = cache.categories.len(),
            attributes = cache.attribute_by_code.len(),
            "lookup cache loaded"
        );

        // === step 3: validate every row ===
        let validator = RowValidator::new(&cache);
        let (valid_rows, mut row_errors) = validator.validate_rows(&rows);
        let rows_valid = valid_rows.len();

        if !row_errors.is_empty() {
            // All errors at this stage are blocking: the batch fails
            // before planning and zero writes are attempted.
            tracing::warn!(
                rows_read,
                rows_valid,
                errors = row_errors.len(),
                "validation errors, aborting before writes"
            );
            return Ok(RunReporter::build(
                &file_name,
                operator,
                dry_run,
                rows_read,
                rows_valid,
                0,
                row_errors,
                vec![],
                vec![],
                false,
                start_time.elapsed().as_millis() as u64,
            ));
        }

        // === step 4: plan diff-based writes per product ===
        let mut skus: Vec<String> = Vec::new();
        for row in &valid_rows {
            if !skus.contains(&row.sku) {
                skus.push(row.sku.clone());
            }
        }
        let existing = self
            .repo
            .load_existing_products(&skus)
            .await
            .map_err(|e| IngestError::DatabaseConnection(e.to_string()))?;

        let planner = BatchPlanner::new(&cache);
        let (intents, cell_errors) = planner.plan(&valid_rows, &existing);
        let products_planned = intents.len();
        row_errors.extend(cell_errors);

        // === step 5: one transaction per product ===
        let WritePhaseResult {
            products,
            write_errors,
            cancelled,
        } = self.writer.write_all(&intents, dry_run).await;

        // === step 6: aggregate ===
        let report = RunReporter::build(
            &file_name,
            operator,
            dry_run,
            rows_read,
            rows_valid,
            products_planned,
            row_errors,
            write_errors,
            products,
            cancelled,
            start_time.elapsed().as_millis() as u64,
        );

        tracing::info!(
            products_planned = report.products_planned,
            products_written = report.products_written,
            products_failed = report.products_failed,
            "ingestion run finished"
        );

        Ok(report)
    }
}
