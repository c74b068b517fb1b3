// ==========================================
// Engine - Row Validator
// ==========================================
// Enforces per-row and cross-field correctness against the read-only
// lookup cache. Errors accumulate: one row can report several, and
// every row is validated even when earlier rows failed, so the report
// is complete in one pass.
// Red line: never mutates state, never touches the database.
// ==========================================

use crate::domain::catalog::{Inventory, LookupCache, QcStatus};
use crate::domain::ingest::{
    ErrorLevel, NormalizedRow, ReferenceKind, RowError, RowErrorKind, ValidRow, VariantInput,
};

/// Canonical fields every row must carry.
const REQUIRED_FIELDS: &[&str] = &["sku", "categoryCode", "name", "mrp", "sellingPrice"];

/// Fields whose presence means the row carries a variant block.
const VARIANT_BLOCK_FIELDS: &[&str] = &[
    "variantSku",
    "variantMrp",
    "variantSellingPrice",
    "color",
    "size",
    "barcode",
    "quantity",
    "reservedQuantity",
    "reorderLevel",
];

// ==========================================
// RowValidator
// ==========================================
pub struct RowValidator<'a> {
    cache: &'a LookupCache,
}

impl<'a> RowValidator<'a> {
    pub fn new(cache: &'a LookupCache) -> Self {
        Self { cache }
    }

    /// Validate every row of the file.
    ///
    /// # Returns
    /// - valid rows, each carrying its resolved category id
    /// - all row errors, indexed by row number and field
    pub fn validate_rows(&self, rows: &[NormalizedRow]) -> (Vec<ValidRow>, Vec<RowError>) {
        let mut valid = Vec::new();
        let mut errors = Vec::new();

        for row in rows {
            if let Some(valid_row) = self.validate_row(row, &mut errors) {
                valid.push(valid_row);
            }
        }

        (valid, errors)
    }

    /// Validate one row, pushing every error it produces. Returns the
    /// ValidRow only when no blocking error was found.
    fn validate_row(&self, row: &NormalizedRow, errors: &mut Vec<RowError>) -> Option<ValidRow> {
        let mut has_error = false;
        let sku = row.get("sku").map(str::to_string);

        // === rule 1: required canonical fields ===
        for field in REQUIRED_FIELDS {
            if row.get(field).is_none() {
                errors.push(blocking_error(
                    row.row_number,
                    sku.clone(),
                    Some(field.to_string()),
                    RowErrorKind::Validation,
                    format!("required field '{}' is missing or empty", field),
                ));
                has_error = true;
            }
        }

        // === rule 2: numeric fields parse to non-negative numbers ===
        let mrp = self.check_price(row, "mrp", &sku, errors, &mut has_error);
        let selling_price = self.check_price(row, "sellingPrice", &sku, errors, &mut has_error);

        // === rule 3: price order ===
        if let (Some(mrp), Some(selling_price)) = (mrp, selling_price) {
            if selling_price > mrp {
                errors.push(blocking_error(
                    row.row_number,
                    sku.clone(),
                    Some("sellingPrice".to_string()),
                    RowErrorKind::PriceOrder { selling_price, mrp },
                    format!("selling price {} exceeds MRP {}", selling_price, mrp),
                ));
                has_error = true;
            }
        }

        // === rule 4: category code resolves ===
        let category = row.get("categoryCode").and_then(|code| {
            let resolved = self.cache.resolve_category(code);
            if resolved.is_none() {
                errors.push(blocking_error(
                    row.row_number,
                    sku.clone(),
                    Some("categoryCode".to_string()),
                    RowErrorKind::Reference {
                        kind: ReferenceKind::Category,
                    },
                    format!("unknown category code '{}'", code),
                ));
            }
            resolved
        });
        if row.get("categoryCode").is_some() && category.is_none() {
            has_error = true;
        }

        // === rule 5: required category attributes present, values allowed ===
        if let Some(category) = category {
            for (binding, attribute) in self.cache.bound_attributes(&category.id) {
                let cell = row.attr_cells.get(&attribute.code);
                if binding.required && cell.is_none() {
                    errors.push(blocking_error(
                        row.row_number,
                        sku.clone(),
                        Some(attribute.code.clone()),
                        RowErrorKind::Validation,
                        format!(
                            "required attribute '{}' is missing for category '{}'",
                            attribute.code, category.slug
                        ),
                    ));
                    has_error = true;
                }
                if let (Some(cell), Some(allowed)) = (cell, binding.allowed_values.as_ref()) {
                    if !allowed.iter().any(|v| v == cell) {
                        errors.push(blocking_error(
                            row.row_number,
                            sku.clone(),
                            Some(attribute.code.clone()),
                            RowErrorKind::Validation,
                            format!(
                                "value '{}' not in allowed values for attribute '{}'",
                                cell, attribute.code
                            ),
                        ));
                        has_error = true;
                    }
                }
            }
        }

        // === rule 6: variant block ===
        let variant = self.check_variant(row, &sku, errors, &mut has_error);

        // === rule 8: explicit QC status change ===
        let qc_status = match row.get("qcStatus") {
            None => None,
            Some(raw) => match QcStatus::parse(raw) {
                Some(status) => Some(status),
                None => {
                    errors.push(blocking_error(
                        row.row_number,
                        sku.clone(),
                        Some("qcStatus".to_string()),
                        RowErrorKind::Validation,
                        format!("invalid qc status '{}'", raw),
                    ));
                    has_error = true;
                    None
                }
            },
        };

        if has_error {
            return None;
        }

        // All blocking checks passed; required fields and prices are
        // present by construction here.
        let category = category?;
        Some(ValidRow {
            row_number: row.row_number,
            sku: sku?,
            category_id: category.id.clone(),
            name: row.get("name")?.to_string(),
            description: row.get("description").map(str::to_string),
            brand: row.get("brand").map(str::to_string),
            hsn_code: row.get("hsnCode").map(str::to_string),
            mrp: mrp?,
            selling_price: selling_price?,
            currency: row
                .get("currency")
                .map(str::to_string)
                .unwrap_or_else(|| "INR".to_string()),
            qc_status,
            images: row
                .get("images")
                .map(|cell| {
                    cell.split('|')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            variant,
            attr_cells: row.attr_cells.clone(),
        })
    }

    /// Rules 6 and 7: variant block shape and inventory integers.
    fn check_variant(
        &self,
        row: &NormalizedRow,
        sku: &Option<String>,
        errors: &mut Vec<RowError>,
        has_error: &mut bool,
    ) -> Option<VariantInput> {
        let block_present = VARIANT_BLOCK_FIELDS.iter().any(|f| row.get(f).is_some());
        if !block_present {
            return None;
        }

        let variant_sku = match row.get("variantSku") {
            Some(v) => v.to_string(),
            None => {
                errors.push(blocking_error(
                    row.row_number,
                    sku.clone(),
                    Some("variantSku".to_string()),
                    RowErrorKind::Validation,
                    "variant block present but variantSku is empty".to_string(),
                ));
                *has_error = true;
                return None;
            }
        };

        let variant_mrp = self.check_price(row, "variantMrp", sku, errors, has_error);
        let variant_selling = self.check_price(row, "variantSellingPrice", sku, errors, has_error);
        if let (Some(mrp), Some(selling_price)) = (variant_mrp, variant_selling) {
            if selling_price > mrp {
                errors.push(blocking_error(
                    row.row_number,
                    sku.clone(),
                    Some("variantSellingPrice".to_string()),
                    RowErrorKind::PriceOrder {
                        selling_price,
                        mrp,
                    },
                    format!(
                        "variant selling price {} exceeds variant MRP {}",
                        selling_price, mrp
                    ),
                ));
                *has_error = true;
            }
        }

        let quantity = self.check_quantity(row, "quantity", sku, errors, has_error);
        let reserved = self.check_quantity(row, "reservedQuantity", sku, errors, has_error);
        let reorder = self.check_quantity(row, "reorderLevel", sku, errors, has_error);

        Some(VariantInput {
            variant_sku,
            color: row.get("color").map(str::to_string),
            size: row.get("size").map(str::to_string),
            mrp: variant_mrp,
            selling_price: variant_selling,
            barcode: row.get("barcode").map(str::to_string),
            inventory: Inventory {
                quantity: quantity.unwrap_or(0),
                reserved_quantity: reserved.unwrap_or(0),
                reorder_level: reorder.unwrap_or(0),
            },
        })
    }

    /// Parse a price cell: non-negative number, thousands separators
    /// tolerated (sellers paste formatted prices).
    fn check_price(
        &self,
        row: &NormalizedRow,
        field: &str,
        sku: &Option<String>,
        errors: &mut Vec<RowError>,
        has_error: &mut bool,
    ) -> Option<f64> {
        let raw = row.get(field)?;
        match raw.replace(',', "").parse::<f64>() {
            Ok(n) if n >= 0.0 => Some(n),
            Ok(n) => {
                errors.push(blocking_error(
                    row.row_number,
                    sku.clone(),
                    Some(field.to_string()),
                    RowErrorKind::Validation,
                    format!("'{}' must be non-negative, got {}", field, n),
                ));
                *has_error = true;
                None
            }
            Err(_) => {
                errors.push(blocking_error(
                    row.row_number,
                    sku.clone(),
                    Some(field.to_string()),
                    RowErrorKind::Validation,
                    format!("'{}' is not a number: '{}'", field, raw),
                ));
                *has_error = true;
                None
            }
        }
    }

    /// Rule 7: inventory cells are non-negative integers.
    fn check_quantity(
        &self,
        row: &NormalizedRow,
        field: &str,
        sku: &Option<String>,
        errors: &mut Vec<RowError>,
        has_error: &mut bool,
    ) -> Option<i64> {
        let raw = row.get(field)?;
        match raw.replace(',', "").parse::<i64>() {
            Ok(n) if n >= 0 => Some(n),
            _ => {
                errors.push(blocking_error(
                    row.row_number,
                    sku.clone(),
                    Some(field.to_string()),
                    RowErrorKind::Validation,
                    format!("'{}' must be a non-negative integer: '{}'", field, raw),
                ));
                *has_error = true;
                None
            }
        }
    }
}

fn blocking_error(
    row_number: usize,
    sku: Option<String>,
    field: Option<String>,
    kind: RowErrorKind,
    message: String,
) -> RowError {
    RowError {
        row_number,
        sku,
        field,
        level: ErrorLevel::Blocking,
        kind,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{Attribute, AttributeValueType, Category, CategoryAttribute};

    fn test_cache() -> LookupCache {
        let mut cache = LookupCache::default();
        cache.categories.insert(
            "c1".to_string(),
            Category {
                id: "c1".to_string(),
                name: "Womens Footwear".to_string(),
                slug: "womens-footwear".to_string(),
                parent_id: None,
                active: true,
            },
        );
        cache
            .category_by_slug
            .insert("womens-footwear".to_string(), "c1".to_string());
        cache.attribute_by_code.insert(
            "material".to_string(),
            Attribute {
                id: "a1".to_string(),
                code: "material".to_string(),
                name: "Material".to_string(),
                value_type: AttributeValueType::Text,
            },
        );
        cache.category_attributes.insert(
            "c1".to_string(),
            vec![CategoryAttribute {
                category_id: "c1".to_string(),
                attribute_id: "a1".to_string(),
                required: true,
                sort_order: 0,
                allowed_values: None,
            }],
        );
        cache
    }

    fn row(row_number: usize, fields: &[(&str, &str)], attrs: &[(&str, &str)]) -> NormalizedRow {
        NormalizedRow {
            row_number,
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            attr_cells: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn base_fields<'a>() -> Vec<(&'a str, &'a str)> {
        vec![
            ("sku", "WK-001"),
            ("categoryCode", "womens-footwear"),
            ("name", "Elegant Heels"),
            ("mrp", "999"),
            ("sellingPrice", "899"),
        ]
    }

    #[test]
    fn test_valid_row_passes_with_resolved_category() {
        let cache = test_cache();
        let validator = RowValidator::new(&cache);
        let rows = vec![row(2, &base_fields(), &[("material", "Leather")])];

        let (valid, errors) = validator.validate_rows(&rows);
        assert_eq!(valid.len(), 1);
        assert!(errors.is_empty());
        assert_eq!(valid[0].category_id, "c1");
        assert_eq!(valid[0].currency, "INR");
    }

    #[test]
    fn test_price_order_error_carries_both_prices() {
        let cache = test_cache();
        let validator = RowValidator::new(&cache);
        let mut fields = base_fields();
        fields[3] = ("mrp", "999");
        fields[4] = ("sellingPrice", "1200");
        let rows = vec![row(2, &fields, &[("material", "Leather")])];

        let (valid, errors) = validator.validate_rows(&rows);
        assert!(valid.is_empty());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].row_number, 2);
        assert_eq!(
            errors[0].kind,
            RowErrorKind::PriceOrder {
                selling_price: 1200.0,
                mrp: 999.0
            }
        );
    }

    #[test]
    fn test_errors_accumulate_on_one_row() {
        let cache = test_cache();
        let validator = RowValidator::new(&cache);
        // missing name, malformed mrp, unknown category: three errors
        let rows = vec![row(
            2,
            &[
                ("sku", "WK-002"),
                ("categoryCode", "no-such-category"),
                ("mrp", "abc"),
                ("sellingPrice", "10"),
            ],
            &[],
        )];

        let (valid, errors) = validator.validate_rows(&rows);
        assert!(valid.is_empty());
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_all_rows_validated_after_failure() {
        let cache = test_cache();
        let validator = RowValidator::new(&cache);
        let bad = row(2, &[("sku", "WK-001")], &[]);
        let good = row(3, &base_fields(), &[("material", "Suede")]);

        let (valid, errors) = validator.validate_rows(&[bad, good]);
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].row_number, 3);
        assert!(errors.iter().all(|e| e.row_number == 2));
    }

    #[test]
    fn test_required_attribute_missing_is_blocking() {
        let cache = test_cache();
        let validator = RowValidator::new(&cache);
        let rows = vec![row(2, &base_fields(), &[])];

        let (valid, errors) = validator.validate_rows(&rows);
        assert!(valid.is_empty());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field.as_deref(), Some("material"));
    }

    #[test]
    fn test_allowed_values_enforced() {
        let mut cache = test_cache();
        cache
            .category_attributes
            .get_mut("c1")
            .unwrap()
            .get_mut(0)
            .unwrap()
            .allowed_values = Some(vec!["Leather".to_string(), "Suede".to_string()]);
        let validator = RowValidator::new(&cache);
        let rows = vec![row(2, &base_fields(), &[("material", "Plastic")])];

        let (valid, errors) = validator.validate_rows(&rows);
        assert!(valid.is_empty());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_variant_block_requires_variant_sku() {
        let cache = test_cache();
        let validator = RowValidator::new(&cache);
        let mut fields = base_fields();
        fields.push(("size", "38"));
        let rows = vec![row(2, &fields, &[("material", "Leather")])];

        let (valid, errors) = validator.validate_rows(&rows);
        assert!(valid.is_empty());
        assert_eq!(errors[0].field.as_deref(), Some("variantSku"));
    }

    #[test]
    fn test_variant_with_inventory_parses() {
        let cache = test_cache();
        let validator = RowValidator::new(&cache);
        let mut fields = base_fields();
        fields.push(("variantSku", "WK-001-38"));
        fields.push(("size", "38"));
        fields.push(("quantity", "25"));
        let rows = vec![row(2, &fields, &[("material", "Leather")])];

        let (valid, errors) = validator.validate_rows(&rows);
        assert!(errors.is_empty());
        let variant = valid[0].variant.as_ref().unwrap();
        assert_eq!(variant.variant_sku, "WK-001-38");
        assert_eq!(variant.inventory.quantity, 25);
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let cache = test_cache();
        let validator = RowValidator::new(&cache);
        let mut fields = base_fields();
        fields.push(("variantSku", "WK-001-38"));
        fields.push(("quantity", "-5"));
        let rows = vec![row(2, &fields, &[("material", "Leather")])];

        let (valid, errors) = validator.validate_rows(&rows);
        assert!(valid.is_empty());
        assert_eq!(errors[0].field.as_deref(), Some("quantity"));
    }

    #[test]
    fn test_unknown_attr_code_not_checked_here() {
        // Unknown attribute codes are a planner concern (cell-level);
        // the validator only checks the category's required bindings.
        let cache = test_cache();
        let validator = RowValidator::new(&cache);
        let rows = vec![row(
            2,
            &base_fields(),
            &[("material", "Leather"), ("unknowncode", "x")],
        )];

        let (valid, errors) = validator.validate_rows(&rows);
        assert_eq!(valid.len(), 1);
        assert!(errors.is_empty());
    }
}
