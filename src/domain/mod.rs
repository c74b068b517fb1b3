// ==========================================
// Domain model layer
// ==========================================
// Responsibility: entities, pipeline types, business value objects.
// Red line: no data access logic, no engine logic.
// ==========================================

pub mod catalog;
pub mod ingest;

pub use catalog::{
    Attribute, AttributeValue, AttributeValueType, Category, CategoryAttribute, Inventory,
    LookupCache, Product, ProductImage, ProductVariant, QcStatus,
};
pub use ingest::{
    ErrorLevel, ExistingProduct, ExistingVariant, ImageDiff, NormalizedRow, ProductFields,
    ProductResult, ProductState, ProductWriteIntent, ReferenceKind, RowError, RowErrorKind,
    ValidRow, VariantDiff, VariantInput, VariantWrite, WriteError,
};
