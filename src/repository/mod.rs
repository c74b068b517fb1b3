// ==========================================
// Repository layer
// ==========================================
// Responsibility: data access for the catalog store.
// Red line: no business rules; CRUD and transactions only.
// ==========================================

pub mod catalog_repo;
pub mod catalog_repo_impl;
pub mod error;

pub use catalog_repo::CatalogRepository;
pub use catalog_repo_impl::CatalogRepositoryImpl;
pub use error::{RepositoryError, RepositoryResult};
