// ==========================================
// Engine - Batch Planner
// ==========================================
// Groups validated rows by product identity and computes a diff-based
// write plan per product. Variant and image changes are explicit
// three-way diffs (insert/update/delete), never delete-and-reinsert,
// so rows referenced elsewhere survive unless the batch truly omits
// them.
// Red line: pure computation, no side effects.
// ==========================================

use crate::domain::catalog::{AttributeValue, LookupCache, ProductImage};
use crate::domain::ingest::{
    ErrorLevel, ExistingProduct, ImageDiff, ProductFields, ProductWriteIntent, ReferenceKind,
    RowError, RowErrorKind, ValidRow, VariantDiff, VariantWrite,
};
use std::collections::HashMap;

// ==========================================
// BatchPlanner
// ==========================================
pub struct BatchPlanner<'a> {
    cache: &'a LookupCache,
}

impl<'a> BatchPlanner<'a> {
    pub fn new(cache: &'a LookupCache) -> Self {
        Self { cache }
    }

    /// Build one write intent per product.
    ///
    /// # Arguments
    /// - valid_rows: validator output, file order
    /// - existing: persisted snapshots keyed by sku (absent = new product)
    ///
    /// # Returns
    /// - intents in first-seen sku order
    /// - cell-level errors (unknown attribute codes, untypable values);
    ///   these exclude single cells, never whole rows
    pub fn plan(
        &self,
        valid_rows: &[ValidRow],
        existing: &HashMap<String, ExistingProduct>,
    ) -> (Vec<ProductWriteIntent>, Vec<RowError>) {
        let mut errors = Vec::new();
        let mut intents = Vec::new();

        for (sku, group) in group_by_sku(valid_rows) {
            let snapshot = existing.get(&sku);
            intents.push(self.plan_product(&sku, &group, snapshot, &mut errors));
        }

        (intents, errors)
    }

    fn plan_product(
        &self,
        sku: &str,
        group: &[&ValidRow],
        existing: Option<&ExistingProduct>,
        errors: &mut Vec<RowError>,
    ) -> ProductWriteIntent {
        // Product-level fields come from the group's first row; later
        // rows only contribute their variant block and attribute cells.
        let head = group[0];

        let fields = ProductFields {
            category_id: head.category_id.clone(),
            name: head.name.clone(),
            description: head.description.clone(),
            brand: head.brand.clone(),
            hsn_code: head.hsn_code.clone(),
            mrp: head.mrp,
            selling_price: head.selling_price,
            currency: head.currency.clone(),
            primary_image_url: head.images.first().cloned(),
            qc_status_override: head.qc_status,
        };

        ProductWriteIntent {
            sku: sku.to_string(),
            existing_id: existing.map(|e| e.id.clone()),
            fields,
            attribute_upserts: self.diff_attributes(group, existing, errors),
            variant_diff: diff_variants(group, existing),
            image_diff: diff_images(&head.images, existing),
            row_numbers: group.iter().map(|r| r.row_number).collect(),
        }
    }

    /// Attribute-value diff: resolve each attr_ cell through the
    /// code→id table, type it, and keep only changed or new values.
    /// Unknown codes and untypable cells are excluded one cell at a
    /// time with a recorded error; the row itself still ingests.
    fn diff_attributes(
        &self,
        group: &[&ValidRow],
        existing: Option<&ExistingProduct>,
        errors: &mut Vec<RowError>,
    ) -> Vec<(String, AttributeValue)> {
        let mut upserts: Vec<(String, AttributeValue)> = Vec::new();
        let mut seen_codes: Vec<String> = Vec::new();

        for row in group {
            // deterministic cell order within the row
            let mut codes: Vec<&String> = row.attr_cells.keys().collect();
            codes.sort();

            for code in codes {
                if seen_codes.iter().any(|c| c == code) {
                    continue; // first row carrying the code wins
                }
                seen_codes.push(code.clone());
                let raw = &row.attr_cells[code];

                let Some(attribute) = self.cache.attribute_by_code.get(code) else {
                    errors.push(RowError {
                        row_number: row.row_number,
                        sku: Some(row.sku.clone()),
                        field: Some(code.clone()),
                        level: ErrorLevel::Cell,
                        kind: RowErrorKind::Reference {
                            kind: ReferenceKind::Attribute,
                        },
                        message: format!("unknown attribute code '{}', cell skipped", code),
                    });
                    continue;
                };

                let Some(value) = AttributeValue::parse(attribute.value_type, raw) else {
                    errors.push(RowError {
                        row_number: row.row_number,
                        sku: Some(row.sku.clone()),
                        field: Some(code.clone()),
                        level: ErrorLevel::Cell,
                        kind: RowErrorKind::Validation,
                        message: format!(
                            "value '{}' is not a valid {} for attribute '{}', cell skipped",
                            raw,
                            attribute.value_type.as_str(),
                            code
                        ),
                    });
                    continue;
                };

                let unchanged = existing
                    .and_then(|e| e.attribute_values.get(&attribute.id))
                    .map(|stored| stored == &value)
                    .unwrap_or(false);
                if !unchanged {
                    upserts.push((attribute.id.clone(), value));
                }
            }
        }

        upserts
    }
}

/// Group rows by sku, preserving first-seen order.
fn group_by_sku(rows: &[ValidRow]) -> Vec<(String, Vec<&ValidRow>)> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&ValidRow>> = HashMap::new();

    for row in rows {
        if !groups.contains_key(&row.sku) {
            order.push(row.sku.clone());
        }
        groups.entry(row.sku.clone()).or_default().push(row);
    }

    order
        .into_iter()
        .map(|sku| {
            let group = groups.remove(&sku).unwrap_or_default();
            (sku, group)
        })
        .collect()
}

/// Three-way variant diff keyed by variant_sku. A later row with the
/// same variant_sku overrides an earlier one (resubmission semantics
/// within a single file).
fn diff_variants(group: &[&ValidRow], existing: Option<&ExistingProduct>) -> VariantDiff {
    let mut incoming: Vec<VariantWrite> = Vec::new();
    for row in group {
        let Some(input) = &row.variant else { continue };
        let write = VariantWrite {
            id: None,
            variant_sku: input.variant_sku.clone(),
            color: input.color.clone(),
            size: input.size.clone(),
            mrp: input.mrp,
            selling_price: input.selling_price,
            barcode: input.barcode.clone(),
            inventory: input.inventory,
        };
        if let Some(slot) = incoming
            .iter_mut()
            .find(|w| w.variant_sku == input.variant_sku)
        {
            *slot = write;
        } else {
            incoming.push(write);
        }
    }

    let mut diff = VariantDiff::default();
    let empty = HashMap::new();
    let stored = existing.map(|e| &e.variants).unwrap_or(&empty);

    for mut write in incoming {
        match stored.get(&write.variant_sku) {
            None => diff.to_insert.push(write),
            Some(current) => {
                let changed = current.color != write.color
                    || current.size != write.size
                    || current.mrp != write.mrp
                    || current.selling_price != write.selling_price
                    || current.barcode != write.barcode
                    || current.inventory != write.inventory;
                if changed {
                    write.id = Some(current.id.clone());
                    diff.to_update.push(write);
                }
            }
        }
    }

    // stored keys absent from the incoming batch get removed
    let incoming_keys: Vec<&str> = group
        .iter()
        .filter_map(|r| r.variant.as_ref())
        .map(|v| v.variant_sku.as_str())
        .collect();
    for (variant_sku, current) in stored {
        if !incoming_keys.contains(&variant_sku.as_str()) {
            diff.to_delete.push(current.id.clone());
        }
    }
    diff.to_delete.sort();

    diff
}

/// Three-way image diff keyed by url; updates are sort-order moves.
fn diff_images(incoming: &[String], existing: Option<&ExistingProduct>) -> ImageDiff {
    let mut diff = ImageDiff::default();
    let stored: HashMap<&str, i32> = existing
        .map(|e| {
            e.images
                .iter()
                .map(|i| (i.image_url.as_str(), i.sort_order))
                .collect()
        })
        .unwrap_or_default();

    for (idx, url) in incoming.iter().enumerate() {
        let sort_order = idx as i32;
        match stored.get(url.as_str()) {
            None => diff.to_insert.push(ProductImage {
                image_url: url.clone(),
                sort_order,
            }),
            Some(current) if *current != sort_order => diff.to_update.push(ProductImage {
                image_url: url.clone(),
                sort_order,
            }),
            Some(_) => {}
        }
    }

    for (url, _) in stored {
        if !incoming.iter().any(|u| u == url) {
            diff.to_delete.push(url.to_string());
        }
    }
    diff.to_delete.sort();

    diff
}
