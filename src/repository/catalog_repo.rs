// ==========================================
// Catalog repository - trait
// ==========================================
// The seam between the ingestion engine and the catalog store.
// Red line: implementations do data access only, no business rules;
// diff computation stays in the planner.
// ==========================================

use crate::domain::catalog::LookupCache;
use crate::domain::ingest::{ExistingProduct, ProductWriteIntent};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Verify the store is reachable and the catalog schema is present.
    /// Called once before any row is processed; failure is fatal.
    async fn ensure_ready(&self) -> RepositoryResult<()>;

    /// Load the read-only per-run lookup cache: category arena,
    /// attribute code→id table, per-category attribute bindings.
    async fn load_lookup_cache(&self) -> RepositoryResult<LookupCache>;

    /// Load current persisted state for the given SKUs, keyed by sku.
    /// SKUs not yet in the store are simply absent from the map.
    async fn load_existing_products(
        &self,
        skus: &[String],
    ) -> RepositoryResult<HashMap<String, ExistingProduct>>;

    /// Apply one product's write intent inside a single transaction:
    /// product upsert, attribute-value diff, variant diff (+ paired
    /// inventory), image diff. With `dry_run` the transaction always
    /// rolls back after executing every step.
    async fn apply_intent(
        &self,
        intent: &ProductWriteIntent,
        dry_run: bool,
    ) -> RepositoryResult<()>;
}
