// ==========================================
// Catalog domain model
// ==========================================
// Aligned with the relational schema in db.rs.
// Responsibility: entity definitions and the typed attribute value.
// Red line: no data access logic, no engine logic.
// ==========================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// QcStatus - quality-check workflow state
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QcStatus {
    Pending,
    Approved,
    Rejected,
}

impl QcStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QcStatus::Pending => "PENDING",
            QcStatus::Approved => "APPROVED",
            QcStatus::Rejected => "REJECTED",
        }
    }

    /// Parse from a cell or column value; case-insensitive.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "PENDING" => Some(QcStatus::Pending),
            "APPROVED" => Some(QcStatus::Approved),
            "REJECTED" => Some(QcStatus::Rejected),
            _ => None,
        }
    }
}

// ==========================================
// AttributeValueType - schema-on-read value kinds
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValueType {
    Text,
    Number,
    Boolean,
    Date,
    Json,
}

impl AttributeValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeValueType::Text => "TEXT",
            AttributeValueType::Number => "NUMBER",
            AttributeValueType::Boolean => "BOOLEAN",
            AttributeValueType::Date => "DATE",
            AttributeValueType::Json => "JSON",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "TEXT" => Some(AttributeValueType::Text),
            "NUMBER" => Some(AttributeValueType::Number),
            "BOOLEAN" => Some(AttributeValueType::Boolean),
            "DATE" => Some(AttributeValueType::Date),
            "JSON" => Some(AttributeValueType::Json),
            _ => None,
        }
    }
}

// ==========================================
// AttributeValue - one populated value slot
// ==========================================
// Exactly one slot per (product, attribute) pair, tagged by the
// attribute's declared value_type. Explicit tagging, not reflection
// over column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Text(String),
    Number(f64),
    Boolean(bool),
    Date(NaiveDate),
    Json(serde_json::Value),
}

impl AttributeValue {
    /// Parse a raw cell according to the attribute's declared type.
    ///
    /// Boolean accepts true/1/yes vs false/0/no (case-insensitive).
    /// Date accepts ISO (YYYY-MM-DD). A scalar cell under a JSON type is
    /// wrapped as {"value": <cell>}, matching the original uploader.
    pub fn parse(value_type: AttributeValueType, raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        match value_type {
            AttributeValueType::Text => Some(AttributeValue::Text(trimmed.to_string())),
            AttributeValueType::Number => trimmed.parse::<f64>().ok().map(AttributeValue::Number),
            AttributeValueType::Boolean => match trimmed.to_lowercase().as_str() {
                "true" | "1" | "yes" => Some(AttributeValue::Boolean(true)),
                "false" | "0" | "no" => Some(AttributeValue::Boolean(false)),
                _ => None,
            },
            AttributeValueType::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .map(AttributeValue::Date),
            AttributeValueType::Json => match serde_json::from_str::<serde_json::Value>(trimmed) {
                Ok(v) if v.is_object() || v.is_array() => Some(AttributeValue::Json(v)),
                _ => Some(AttributeValue::Json(serde_json::json!({ "value": trimmed }))),
            },
        }
    }
}

// ==========================================
// Category - tree node (forest via parent_id)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,                // unique, used as categoryCode in files
    pub parent_id: Option<String>,   // by id, never by pointer
    pub active: bool,
}

// ==========================================
// Attribute - global dynamic-attribute definition
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    pub id: String,
    pub code: String,                // unique; attr_<code> column naming
    pub name: String,
    pub value_type: AttributeValueType,
}

// ==========================================
// CategoryAttribute - per-category applicability
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryAttribute {
    pub category_id: String,
    pub attribute_id: String,
    pub required: bool,
    pub sort_order: i32,
    pub allowed_values: Option<Vec<String>>, // closed value list when present
}

// ==========================================
// Product - catalog head row
// ==========================================
// QC fields are owned by the QC workflow; ingestion preserves them on
// resubmission (see the writer's field-update policy).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub sku: String,
    pub category_id: String,
    pub name: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub hsn_code: Option<String>,
    pub mrp: f64,
    pub selling_price: f64,
    pub currency: String,
    pub primary_image_url: Option<String>,
    pub qc_status: QcStatus,
    pub qc_reason: Option<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// ProductVariant - one size/color combination
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: String,
    pub product_id: String,
    pub variant_sku: String,         // unique across the whole store
    pub color: Option<String>,
    pub size: Option<String>,
    pub mrp: Option<f64>,
    pub selling_price: Option<f64>,
    pub barcode: Option<String>,
}

// ==========================================
// Inventory - 1:1 with variant
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub quantity: i64,
    pub reserved_quantity: i64,
    pub reorder_level: i64,
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            quantity: 0,
            reserved_quantity: 0,
            reorder_level: 0,
        }
    }
}

// ==========================================
// ProductImage - gallery entry, ordered
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductImage {
    pub image_url: String,
    pub sort_order: i32,
}

// ==========================================
// LookupCache - read-only per-run reference data
// ==========================================
// Built once per run, shared read-only by planner and writer. The
// category tree is an arena keyed by id with parent references by id,
// so parallel per-product writers can read it without ownership cycles.
#[derive(Debug, Clone, Default)]
pub struct LookupCache {
    /// Category arena: id → node.
    pub categories: HashMap<String, Category>,
    /// slug → category id.
    pub category_by_slug: HashMap<String, String>,
    /// attribute code → definition.
    pub attribute_by_code: HashMap<String, Attribute>,
    /// category id → applicable attribute bindings (sorted by sort_order).
    pub category_attributes: HashMap<String, Vec<CategoryAttribute>>,
}

impl LookupCache {
    /// Resolve a category code (slug) to its id; inactive categories do
    /// not resolve.
    pub fn resolve_category(&self, slug: &str) -> Option<&Category> {
        self.category_by_slug
            .get(slug.trim())
            .and_then(|id| self.categories.get(id))
            .filter(|c| c.active)
    }

    /// Attribute definition by id (the bindings reference ids).
    pub fn attribute_by_id(&self, attribute_id: &str) -> Option<&Attribute> {
        self.attribute_by_code
            .values()
            .find(|a| a.id == attribute_id)
    }

    /// All attribute bindings applicable to a category, in sort order.
    pub fn bound_attributes(&self, category_id: &str) -> Vec<(&CategoryAttribute, &Attribute)> {
        let Some(bindings) = self.category_attributes.get(category_id) else {
            return Vec::new();
        };
        bindings
            .iter()
            .filter_map(|b| self.attribute_by_id(&b.attribute_id).map(|a| (b, a)))
            .collect()
    }

    /// Required attribute bindings for a category, in sort order.
    pub fn required_attributes(&self, category_id: &str) -> Vec<(&CategoryAttribute, &Attribute)> {
        self.bound_attributes(category_id)
            .into_iter()
            .filter(|(b, _)| b.required)
            .collect()
    }
}
