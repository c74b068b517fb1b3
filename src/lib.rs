// ==========================================
// Bulk catalog ingestion engine - core library
// ==========================================
// Reads a tabular file (CSV/Excel), validates every row against the
// category-driven attribute schema, and applies validated rows as
// atomic per-product upserts into the relational catalog store.
// Stack: Rust + SQLite (rusqlite) + csv/calamine.
// ==========================================

// ==========================================
// Module declarations
// ==========================================

// Domain layer - entities and pipeline types
pub mod domain;

// Repository layer - data access
pub mod repository;

// Engine layer - validation, planning, writing, reporting
pub mod engine;

// File reading layer - parsers and column normalization
pub mod importer;

// Database infrastructure (connection setup / unified PRAGMAs / schema)
pub mod db;

// Logging
pub mod logging;

// ==========================================
// Core type re-exports
// ==========================================

pub use domain::{
    Attribute, AttributeValue, AttributeValueType, Category, CategoryAttribute, Inventory,
    LookupCache, Product, ProductImage, ProductVariant, QcStatus,
};

pub use domain::{
    ErrorLevel, NormalizedRow, ProductResult, ProductState, ProductWriteIntent, ReferenceKind,
    RowError, RowErrorKind, ValidRow, WriteError,
};

pub use engine::{
    CatalogIngestor, RunReport, EXIT_FATAL, EXIT_OK, EXIT_VALIDATION_ERRORS, EXIT_WRITE_FAILURES,
};

pub use importer::{IngestError, IngestResult};

pub use repository::{CatalogRepository, CatalogRepositoryImpl, RepositoryError};

// ==========================================
// Constants
// ==========================================

// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Application name
pub const APP_NAME: &str = "catalog-ingest";
