// ==========================================
// Ingestion pipeline types
// ==========================================
// Intermediate products of the ingestion flow:
//   normalizer → validator → planner → writer → reporter
// Lifecycle: these types live only inside one ingestion run; the final
// RunReport is the sole output of a run.
// ==========================================

use crate::domain::catalog::{AttributeValue, Inventory, ProductImage, QcStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// NormalizedRow - canonical row shape
// ==========================================
// Produced by the Column Normalizer. Field names are canonical
// (camelCase), attr_ cells are split out with the prefix stripped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedRow {
    /// 1-based file row number; the header is row 1, data starts at 2.
    pub row_number: usize,
    /// canonical field → raw trimmed cell value (empty cells omitted)
    pub fields: HashMap<String, String>,
    /// attribute code (lowercased, prefix stripped) → raw cell value
    pub attr_cells: HashMap<String, String>,
}

impl NormalizedRow {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

// ==========================================
// Row-level errors (collected, never fatal)
// ==========================================

/// Which reference data a row failed to resolve against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceKind {
    Category,
    Attribute,
}

/// Error level: Blocking errors fail the batch before any write;
/// Cell errors exclude a single attribute cell and let the row proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorLevel {
    Blocking,
    Cell,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RowErrorKind {
    /// Missing or malformed field value.
    Validation,
    /// selling price exceeds MRP.
    PriceOrder { selling_price: f64, mrp: f64 },
    /// Unknown category code or attribute code.
    Reference { kind: ReferenceKind },
}

impl RowErrorKind {
    /// Stable key for the rejected-by-kind report buckets.
    pub fn key(&self) -> &'static str {
        match self {
            RowErrorKind::Validation => "validation",
            RowErrorKind::PriceOrder { .. } => "price_order",
            RowErrorKind::Reference {
                kind: ReferenceKind::Category,
            } => "reference_category",
            RowErrorKind::Reference {
                kind: ReferenceKind::Attribute,
            } => "reference_attribute",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowError {
    pub row_number: usize,
    pub sku: Option<String>,
    pub field: Option<String>,
    pub level: ErrorLevel,
    pub kind: RowErrorKind,
    pub message: String,
}

/// Transaction failure for one product; isolates that product only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteError {
    pub sku: String,
    pub cause: String,
}

// ==========================================
// ValidRow - validator output
// ==========================================
// Carries the resolved category id; attribute cells stay raw here and
// are typed by the planner through the code→id table.
#[derive(Debug, Clone)]
pub struct ValidRow {
    pub row_number: usize,
    pub sku: String,
    pub category_id: String,
    pub name: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub hsn_code: Option<String>,
    pub mrp: f64,
    pub selling_price: f64,
    pub currency: String,
    /// Explicit QC status change carried by the batch; None preserves
    /// whatever the QC workflow last decided.
    pub qc_status: Option<QcStatus>,
    /// Gallery urls in file order (pipe-separated `images` cell).
    pub images: Vec<String>,
    pub variant: Option<VariantInput>,
    pub attr_cells: HashMap<String, String>,
}

/// Variant block of one row (a product spans one row per variant).
#[derive(Debug, Clone, PartialEq)]
pub struct VariantInput {
    pub variant_sku: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub mrp: Option<f64>,
    pub selling_price: Option<f64>,
    pub barcode: Option<String>,
    pub inventory: Inventory,
}

// ==========================================
// Existing-state snapshots (loaded once per run)
// ==========================================

#[derive(Debug, Clone)]
pub struct ExistingVariant {
    pub id: String,
    pub variant_sku: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub mrp: Option<f64>,
    pub selling_price: Option<f64>,
    pub barcode: Option<String>,
    pub inventory: Inventory,
}

/// Current persisted shape of one product, used by the planner to
/// compute three-way diffs instead of delete-and-reinsert.
#[derive(Debug, Clone, Default)]
pub struct ExistingProduct {
    pub id: String,
    /// variant_sku → stored variant (+ paired inventory)
    pub variants: HashMap<String, ExistingVariant>,
    /// stored gallery in sort order
    pub images: Vec<ProductImage>,
    /// attribute id → stored value
    pub attribute_values: HashMap<String, AttributeValue>,
}

// ==========================================
// Write intents (planner output)
// ==========================================

/// Product head fields the upsert refreshes. QC fields are deliberately
/// absent; `qc_status_override` is the one explicit escape hatch.
#[derive(Debug, Clone)]
pub struct ProductFields {
    pub category_id: String,
    pub name: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub hsn_code: Option<String>,
    pub mrp: f64,
    pub selling_price: f64,
    pub currency: String,
    pub primary_image_url: Option<String>,
    pub qc_status_override: Option<QcStatus>,
}

/// One variant to insert or update, with its paired inventory values.
#[derive(Debug, Clone)]
pub struct VariantWrite {
    /// Existing row id for updates; None for inserts.
    pub id: Option<String>,
    pub variant_sku: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub mrp: Option<f64>,
    pub selling_price: Option<f64>,
    pub barcode: Option<String>,
    pub inventory: Inventory,
}

/// Three disjoint sets keyed by variant_sku. Deletes carry the stored
/// row id so the paired inventory row goes with it.
#[derive(Debug, Clone, Default)]
pub struct VariantDiff {
    pub to_insert: Vec<VariantWrite>,
    pub to_update: Vec<VariantWrite>,
    pub to_delete: Vec<String>,
}

impl VariantDiff {
    pub fn is_empty(&self) -> bool {
        self.to_insert.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }
}

/// Three disjoint sets keyed by image url; updates are sort-order moves.
#[derive(Debug, Clone, Default)]
pub struct ImageDiff {
    pub to_insert: Vec<ProductImage>,
    pub to_update: Vec<ProductImage>,
    /// urls to remove
    pub to_delete: Vec<String>,
}

impl ImageDiff {
    pub fn is_empty(&self) -> bool {
        self.to_insert.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }
}

/// The full write plan for one product; applied in a single transaction.
#[derive(Debug, Clone)]
pub struct ProductWriteIntent {
    pub sku: String,
    /// Existing product id when this is a resubmission.
    pub existing_id: Option<String>,
    pub fields: ProductFields,
    /// attribute id → typed value, changed or new values only
    pub attribute_upserts: Vec<(String, AttributeValue)>,
    pub variant_diff: VariantDiff,
    pub image_diff: ImageDiff,
    /// file rows that contributed to this intent
    pub row_numbers: Vec<usize>,
}

// ==========================================
// Per-product run state machine
// ==========================================
// VALIDATED → PLANNED → WRITTEN | FAILED; WOULD_WRITE under dry-run.
// Terminal states are per-product, never cross products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductState {
    Validated,
    Planned,
    Written,
    WouldWrite,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductResult {
    pub sku: String,
    pub state: ProductState,
    pub error: Option<String>,
}
