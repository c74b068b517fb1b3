// ==========================================
// Engine - Run Reporter
// ==========================================
// Aggregates counts and errors into the final report. The report is
// the sole output of a run: the CLI serializes it as JSON and derives
// its exit code from it.
// ==========================================

use crate::domain::ingest::{ErrorLevel, ProductResult, ProductState, RowError, WriteError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Process exit codes for a finished (non-fatal) run.
pub const EXIT_OK: i32 = 0;
pub const EXIT_VALIDATION_ERRORS: i32 = 1;
pub const EXIT_WRITE_FAILURES: i32 = 2;
pub const EXIT_FATAL: i32 = 3;

// ==========================================
// RunReport
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub file_name: String,
    pub operator: Option<String>,
    pub dry_run: bool,

    // ===== row counts =====
    pub rows_read: usize,
    pub rows_valid: usize,
    /// rows excluded by blocking errors
    pub rows_rejected: usize,
    /// error-kind key → occurrences (cell-level included)
    pub rejected_by_kind: BTreeMap<String, usize>,

    // ===== product counts =====
    pub products_planned: usize,
    pub products_written: usize,
    pub products_failed: usize,
    /// dry-run only: products whose transaction succeeded and rolled back
    pub products_would_write: usize,

    // ===== detail =====
    pub row_errors: Vec<RowError>,
    pub write_errors: Vec<WriteError>,
    pub products: Vec<ProductResult>,

    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl RunReport {
    /// True when at least one blocking row error exists; cell-level
    /// errors (excluded attribute cells) do not block the batch.
    pub fn has_blocking_errors(&self) -> bool {
        self.row_errors
            .iter()
            .any(|e| e.level == ErrorLevel::Blocking)
    }

    /// Exit code contract:
    /// 0 all rows valid and all products written;
    /// 1 blocking validation errors exist, zero writes attempted;
    /// 2 all rows valid but one or more products failed at write time.
    /// (3 is fatal and never reaches a report.)
    pub fn exit_code(&self) -> i32 {
        if self.has_blocking_errors() {
            EXIT_VALIDATION_ERRORS
        } else if !self.write_errors.is_empty() {
            EXIT_WRITE_FAILURES
        } else {
            EXIT_OK
        }
    }
}

// ==========================================
// RunReporter
// ==========================================
pub struct RunReporter;

impl RunReporter {
    /// Aggregate one run's counters and error lists.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        file_name: &str,
        operator: Option<&str>,
        dry_run: bool,
        rows_read: usize,
        rows_valid: usize,
        products_planned: usize,
        row_errors: Vec<RowError>,
        write_errors: Vec<WriteError>,
        products: Vec<ProductResult>,
        cancelled: bool,
        elapsed_ms: u64,
    ) -> RunReport {
        let mut rejected_rows: Vec<usize> = row_errors
            .iter()
            .filter(|e| e.level == ErrorLevel::Blocking)
            .map(|e| e.row_number)
            .collect();
        rejected_rows.sort_unstable();
        rejected_rows.dedup();

        let mut rejected_by_kind = BTreeMap::new();
        for error in &row_errors {
            *rejected_by_kind
                .entry(error.kind.key().to_string())
                .or_insert(0) += 1;
        }

        let products_written = products
            .iter()
            .filter(|p| p.state == ProductState::Written)
            .count();
        let products_failed = products
            .iter()
            .filter(|p| p.state == ProductState::Failed)
            .count();
        let products_would_write = products
            .iter()
            .filter(|p| p.state == ProductState::WouldWrite)
            .count();

        RunReport {
            file_name: file_name.to_string(),
            operator: operator.map(str::to_string),
            dry_run,
            rows_read,
            rows_valid,
            rows_rejected: rejected_rows.len(),
            rejected_by_kind,
            products_planned,
            products_written,
            products_failed,
            products_would_write,
            row_errors,
            write_errors,
            products,
            cancelled,
            elapsed_ms,
        }
    }
}
