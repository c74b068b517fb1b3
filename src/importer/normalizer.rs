// ==========================================
// Ingestion - Column Normalizer
// ==========================================
// Resolves header aliases into the canonical row shape. Resolution
// happens once per file from the header row, never per cell.
// Aliasing is bidirectional: variant_sku, variantSku and "Variant SKU"
// all land on the same canonical field.
// ==========================================

use crate::domain::ingest::NormalizedRow;
use crate::importer::file_parser::RawTable;
use std::collections::HashMap;

/// Reserved prefix for dynamic attribute columns.
pub const ATTR_PREFIX: &str = "attr_";

/// Canonical field names, camelCase, in template order.
pub const CANONICAL_FIELDS: &[&str] = &[
    "sku",
    "categoryCode",
    "name",
    "description",
    "brand",
    "hsnCode",
    "mrp",
    "sellingPrice",
    "currency",
    "images",
    "variantSku",
    "variantMrp",
    "variantSellingPrice",
    "color",
    "size",
    "barcode",
    "quantity",
    "reservedQuantity",
    "reorderLevel",
    "qcStatus",
];

/// Header resolution outcome for one column.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ResolvedHeader {
    /// Matched a canonical field.
    Canonical(&'static str),
    /// attr_<code> dynamic attribute column (code lowercased).
    Attribute(String),
    /// Unknown column, passed through under its trimmed name.
    Passthrough(String),
    /// Empty header cell; the column is dropped.
    Blank,
}

// ==========================================
// ColumnNormalizer
// ==========================================
pub struct ColumnNormalizer {
    /// fold(alias) → canonical field, built once
    alias_index: HashMap<String, &'static str>,
}

impl Default for ColumnNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnNormalizer {
    pub fn new() -> Self {
        let mut alias_index = HashMap::new();
        for field in CANONICAL_FIELDS {
            alias_index.insert(fold_header(field), *field);
        }
        // Aliases seen in real seller templates that don't fold onto the
        // canonical name by themselves.
        alias_index.insert(fold_header("category_slug"), "categoryCode");
        alias_index.insert(fold_header("category"), "categoryCode");
        alias_index.insert(fold_header("product name"), "name");
        alias_index.insert(fold_header("selling price"), "sellingPrice");
        alias_index.insert(fold_header("stock"), "quantity");

        Self { alias_index }
    }

    /// Normalize a parsed table into canonical rows.
    ///
    /// Alias resolution runs once over the header row; every data row is
    /// then mapped by column index. Empty cells are omitted from the row
    /// map so "present" always means non-empty.
    pub fn normalize(&self, table: &RawTable) -> Vec<NormalizedRow> {
        let resolved: Vec<ResolvedHeader> = table
            .headers
            .iter()
            .map(|h| self.resolve_header(h))
            .collect();

        let mut rows = Vec::with_capacity(table.rows.len());
        for (row_number, cells) in &table.rows {
            let mut fields = HashMap::new();
            let mut attr_cells = HashMap::new();

            for (col_idx, value) in cells.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                match resolved.get(col_idx) {
                    Some(ResolvedHeader::Canonical(field)) => {
                        fields.insert((*field).to_string(), value.clone());
                    }
                    Some(ResolvedHeader::Attribute(code)) => {
                        attr_cells.insert(code.clone(), value.clone());
                    }
                    Some(ResolvedHeader::Passthrough(name)) => {
                        fields.insert(name.clone(), value.clone());
                    }
                    Some(ResolvedHeader::Blank) | None => {}
                }
            }

            rows.push(NormalizedRow {
                row_number: *row_number,
                fields,
                attr_cells,
            });
        }

        rows
    }

    fn resolve_header(&self, raw: &str) -> ResolvedHeader {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return ResolvedHeader::Blank;
        }

        let lower = trimmed.to_lowercase();
        if let Some(code) = lower.strip_prefix(ATTR_PREFIX) {
            return ResolvedHeader::Attribute(code.to_string());
        }

        match self.alias_index.get(&fold_header(trimmed)) {
            Some(field) => ResolvedHeader::Canonical(field),
            None => ResolvedHeader::Passthrough(trimmed.to_string()),
        }
    }
}

/// Fold a header for alias matching: lowercase with separators and
/// camel humps removed, so sellingPrice / selling_price / "Selling
/// Price" all produce "sellingprice".
fn fold_header(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-' | '\t'))
        .flat_map(|c| c.to_lowercase())
        .collect()
}
