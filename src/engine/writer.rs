// ==========================================
// Engine - Transactional Writer
// ==========================================
// Applies one write intent per product, each inside its own database
// transaction. A failed product rolls back alone and the run
// continues; cancellation is honored only between products, never
// inside a transaction.
// Red line: all database access goes through the repository.
// ==========================================

use crate::domain::ingest::{ProductResult, ProductState, ProductWriteIntent, WriteError};
use crate::repository::catalog_repo::CatalogRepository;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ==========================================
// TransactionalWriter
// ==========================================
pub struct TransactionalWriter {
    repo: Arc<dyn CatalogRepository>,
    /// Checked between product transactions; set by the caller to stop
    /// a long batch at the next safe boundary.
    cancel: Arc<AtomicBool>,
}

/// Outcome of the write phase.
#[derive(Debug, Default)]
pub struct WritePhaseResult {
    pub products: Vec<ProductResult>,
    pub write_errors: Vec<WriteError>,
    /// True when the run stopped at a cancellation boundary; products
    /// after the boundary keep their Planned state.
    pub cancelled: bool,
}

impl TransactionalWriter {
    pub fn new(repo: Arc<dyn CatalogRepository>) -> Self {
        Self {
            repo,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle the caller can use to request cancellation.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Apply every intent, one product transaction at a time.
    ///
    /// With `dry_run` each transaction executes fully and then rolls
    /// back, so the per-product report is identical but nothing
    /// persists.
    pub async fn write_all(
        &self,
        intents: &[ProductWriteIntent],
        dry_run: bool,
    ) -> WritePhaseResult {
        let mut result = WritePhaseResult::default();

        for intent in intents {
            // Safe stopping point: no transaction is open here.
            if self.cancel.load(Ordering::SeqCst) {
                tracing::warn!(sku = %intent.sku, "cancellation requested, stopping before next product");
                result.cancelled = true;
                result.products.push(ProductResult {
                    sku: intent.sku.clone(),
                    state: ProductState::Planned,
                    error: None,
                });
                continue;
            }

            match self.repo.apply_intent(intent, dry_run).await {
                Ok(()) => {
                    let state = if dry_run {
                        ProductState::WouldWrite
                    } else {
                        ProductState::Written
                    };
                    tracing::debug!(sku = %intent.sku, ?state, "product transaction finished");
                    result.products.push(ProductResult {
                        sku: intent.sku.clone(),
                        state,
                        error: None,
                    });
                }
                Err(e) => {
                    // This product rolled back; the rest of the batch
                    // is unaffected.
                    let cause = e.to_string();
                    tracing::warn!(sku = %intent.sku, error = %cause, "product transaction failed");
                    result.write_errors.push(WriteError {
                        sku: intent.sku.clone(),
                        cause: cause.clone(),
                    });
                    result.products.push(ProductResult {
                        sku: intent.sku.clone(),
                        state: ProductState::Failed,
                        error: Some(cause),
                    });
                }
            }
        }

        result
    }
}
