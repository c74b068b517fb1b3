// ==========================================
// Catalog repository - rusqlite implementation
// ==========================================
// Responsibility: data access for the ingestion engine.
// Red line: no business rules; the planner decides what changes, this
// layer only executes the plan inside one transaction per product.
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::catalog::{
    Attribute, AttributeValue, AttributeValueType, Category, CategoryAttribute, Inventory,
    LookupCache, ProductImage, QcStatus,
};
use crate::domain::ingest::{ExistingProduct, ExistingVariant, ProductWriteIntent, VariantWrite};
use crate::repository::catalog_repo::CatalogRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, Transaction};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ==========================================
// CatalogRepositoryImpl
// ==========================================
pub struct CatalogRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl CatalogRepositoryImpl {
    /// Open the store at `db_path` with the unified PRAGMA set.
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Wrap an already-configured connection (tests).
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // Transaction step helpers
    // ==========================================

    /// Step (a): upsert the product head row by sku. Content fields
    /// refresh on conflict; QC fields are preserved unless the intent
    /// carries an explicit status override.
    fn upsert_product_tx(
        tx: &Transaction,
        intent: &ProductWriteIntent,
        now: &str,
    ) -> RepositoryResult<String> {
        let f = &intent.fields;
        let new_id = Uuid::new_v4().to_string();
        let insert_status = f
            .qc_status_override
            .unwrap_or(QcStatus::Pending)
            .as_str();

        let sql = if f.qc_status_override.is_some() {
            r#"
            INSERT INTO products (
                id, sku, category_id, name, description, brand, hsn_code,
                mrp, selling_price, currency, primary_image_url, qc_status,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
            ON CONFLICT(sku) DO UPDATE SET
                category_id = excluded.category_id,
                name = excluded.name,
                description = excluded.description,
                brand = excluded.brand,
                hsn_code = excluded.hsn_code,
                mrp = excluded.mrp,
                selling_price = excluded.selling_price,
                currency = excluded.currency,
                primary_image_url = excluded.primary_image_url,
                qc_status = excluded.qc_status,
                updated_at = excluded.updated_at
            "#
        } else {
            r#"
            INSERT INTO products (
                id, sku, category_id, name, description, brand, hsn_code,
                mrp, selling_price, currency, primary_image_url, qc_status,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
            ON CONFLICT(sku) DO UPDATE SET
                category_id = excluded.category_id,
                name = excluded.name,
                description = excluded.description,
                brand = excluded.brand,
                hsn_code = excluded.hsn_code,
                mrp = excluded.mrp,
                selling_price = excluded.selling_price,
                currency = excluded.currency,
                primary_image_url = excluded.primary_image_url,
                updated_at = excluded.updated_at
            "#
        };

        tx.execute(
            sql,
            params![
                new_id,
                intent.sku,
                f.category_id,
                f.name,
                f.description,
                f.brand,
                f.hsn_code,
                f.mrp,
                f.selling_price,
                f.currency,
                f.primary_image_url,
                insert_status,
                now,
            ],
        )?;

        let product_id: String = tx.query_row(
            "SELECT id FROM products WHERE sku = ?1",
            params![intent.sku],
            |row| row.get(0),
        )?;
        Ok(product_id)
    }

    /// Step (b): apply the attribute-value diff.
    fn apply_attribute_upserts_tx(
        tx: &Transaction,
        product_id: &str,
        upserts: &[(String, AttributeValue)],
        now: &str,
    ) -> RepositoryResult<()> {
        let mut stmt = tx.prepare(
            r#"
            INSERT INTO product_attribute_values (
                product_id, attribute_id, value_text, value_number,
                value_boolean, value_date, value_json, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(product_id, attribute_id) DO UPDATE SET
                value_text = excluded.value_text,
                value_number = excluded.value_number,
                value_boolean = excluded.value_boolean,
                value_date = excluded.value_date,
                value_json = excluded.value_json,
                updated_at = excluded.updated_at
            "#,
        )?;

        for (attribute_id, value) in upserts {
            let mut value_text: Option<String> = None;
            let mut value_number: Option<f64> = None;
            let mut value_boolean: Option<i64> = None;
            let mut value_date: Option<String> = None;
            let mut value_json: Option<String> = None;

            match value {
                AttributeValue::Text(s) => value_text = Some(s.clone()),
                AttributeValue::Number(n) => value_number = Some(*n),
                AttributeValue::Boolean(b) => value_boolean = Some(*b as i64),
                AttributeValue::Date(d) => value_date = Some(d.format("%Y-%m-%d").to_string()),
                AttributeValue::Json(v) => value_json = Some(v.to_string()),
            }

            stmt.execute(params![
                product_id,
                attribute_id,
                value_text,
                value_number,
                value_boolean,
                value_date,
                value_json,
                now,
            ])?;
        }

        Ok(())
    }

    /// Step (c): apply the variant diff; every inserted or updated
    /// variant gets its paired inventory row upserted in the same
    /// transaction. Deletes cascade to inventory.
    fn apply_variant_diff_tx(
        tx: &Transaction,
        product_id: &str,
        intent: &ProductWriteIntent,
        now: &str,
    ) -> RepositoryResult<()> {
        for write in &intent.variant_diff.to_insert {
            let variant_id = Uuid::new_v4().to_string();
            tx.execute(
                r#"
                INSERT INTO product_variants (
                    id, product_id, variant_sku, color, size, mrp,
                    selling_price, barcode, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
                "#,
                params![
                    variant_id,
                    product_id,
                    write.variant_sku,
                    write.color,
                    write.size,
                    write.mrp,
                    write.selling_price,
                    write.barcode,
                    now,
                ],
            )?;
            Self::upsert_inventory_tx(tx, &variant_id, write, now)?;
        }

        for write in &intent.variant_diff.to_update {
            let variant_id = write.id.as_deref().ok_or_else(|| {
                RepositoryError::InternalError(format!(
                    "variant update without stored id: {}",
                    write.variant_sku
                ))
            })?;
            tx.execute(
                r#"
                UPDATE product_variants SET
                    color = ?1, size = ?2, mrp = ?3, selling_price = ?4,
                    barcode = ?5, updated_at = ?6
                WHERE id = ?7
                "#,
                params![
                    write.color,
                    write.size,
                    write.mrp,
                    write.selling_price,
                    write.barcode,
                    now,
                    variant_id,
                ],
            )?;
            Self::upsert_inventory_tx(tx, variant_id, write, now)?;
        }

        for variant_id in &intent.variant_diff.to_delete {
            tx.execute(
                "DELETE FROM product_variants WHERE id = ?1",
                params![variant_id],
            )?;
        }

        Ok(())
    }

    fn upsert_inventory_tx(
        tx: &Transaction,
        variant_id: &str,
        write: &VariantWrite,
        now: &str,
    ) -> RepositoryResult<()> {
        tx.execute(
            r#"
            INSERT INTO inventory (variant_id, quantity, reserved_quantity, reorder_level, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(variant_id) DO UPDATE SET
                quantity = excluded.quantity,
                reserved_quantity = excluded.reserved_quantity,
                reorder_level = excluded.reorder_level,
                updated_at = excluded.updated_at
            "#,
            params![
                variant_id,
                write.inventory.quantity,
                write.inventory.reserved_quantity,
                write.inventory.reorder_level,
                now,
            ],
        )?;
        Ok(())
    }

    /// Step (d): apply the image diff preserving sort order.
    fn apply_image_diff_tx(
        tx: &Transaction,
        product_id: &str,
        intent: &ProductWriteIntent,
    ) -> RepositoryResult<()> {
        for image in &intent.image_diff.to_insert {
            tx.execute(
                "INSERT INTO product_images (id, product_id, image_url, sort_order) VALUES (?1, ?2, ?3, ?4)",
                params![
                    Uuid::new_v4().to_string(),
                    product_id,
                    image.image_url,
                    image.sort_order,
                ],
            )?;
        }

        for image in &intent.image_diff.to_update {
            tx.execute(
                "UPDATE product_images SET sort_order = ?1 WHERE product_id = ?2 AND image_url = ?3",
                params![image.sort_order, product_id, image.image_url],
            )?;
        }

        for url in &intent.image_diff.to_delete {
            tx.execute(
                "DELETE FROM product_images WHERE product_id = ?1 AND image_url = ?2",
                params![product_id, url],
            )?;
        }

        Ok(())
    }

    /// Reconstruct the typed value from whichever slot is populated.
    fn read_attribute_value(
        value_text: Option<String>,
        value_number: Option<f64>,
        value_boolean: Option<i64>,
        value_date: Option<String>,
        value_json: Option<String>,
    ) -> RepositoryResult<AttributeValue> {
        if let Some(s) = value_text {
            return Ok(AttributeValue::Text(s));
        }
        if let Some(n) = value_number {
            return Ok(AttributeValue::Number(n));
        }
        if let Some(b) = value_boolean {
            return Ok(AttributeValue::Boolean(b != 0));
        }
        if let Some(d) = value_date {
            return chrono::NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                .map(AttributeValue::Date)
                .map_err(|e| RepositoryError::FieldValueError {
                    field: "value_date".to_string(),
                    message: e.to_string(),
                });
        }
        if let Some(j) = value_json {
            return serde_json::from_str(&j)
                .map(AttributeValue::Json)
                .map_err(|e| RepositoryError::FieldValueError {
                    field: "value_json".to_string(),
                    message: e.to_string(),
                });
        }
        Err(RepositoryError::FieldValueError {
            field: "product_attribute_values".to_string(),
            message: "no value slot populated".to_string(),
        })
    }
}

#[async_trait]
impl CatalogRepository for CatalogRepositoryImpl {
    async fn ensure_ready(&self) -> RepositoryResult<()> {
        let conn = self.lock()?;
        let present: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('products','categories','attributes')",
                [],
                |row| row.get(0),
            )
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        if present < 3 {
            return Err(RepositoryError::DatabaseConnectionError(
                "catalog schema not initialized".to_string(),
            ));
        }
        Ok(())
    }

    async fn load_lookup_cache(&self) -> RepositoryResult<LookupCache> {
        let conn = self.lock()?;
        let mut cache = LookupCache::default();

        let mut stmt =
            conn.prepare("SELECT id, name, slug, parent_id, active FROM categories")?;
        let categories = stmt.query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                slug: row.get(2)?,
                parent_id: row.get(3)?,
                active: row.get::<_, i64>(4)? != 0,
            })
        })?;
        for category in categories {
            let category = category?;
            cache
                .category_by_slug
                .insert(category.slug.clone(), category.id.clone());
            cache.categories.insert(category.id.clone(), category);
        }

        let mut stmt = conn.prepare("SELECT id, code, name, value_type FROM attributes")?;
        let attributes = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;
        for attribute in attributes {
            let (id, code, name, value_type_raw) = attribute?;
            let value_type = AttributeValueType::parse(&value_type_raw).ok_or_else(|| {
                RepositoryError::FieldValueError {
                    field: "attributes.value_type".to_string(),
                    message: format!("unknown value_type '{}' for code '{}'", value_type_raw, code),
                }
            })?;
            cache.attribute_by_code.insert(
                code.clone(),
                Attribute {
                    id,
                    code,
                    name,
                    value_type,
                },
            );
        }

        let mut stmt = conn.prepare(
            "SELECT category_id, attribute_id, required, sort_order, allowed_values
             FROM category_attributes ORDER BY category_id, sort_order",
        )?;
        let bindings = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)? != 0,
                row.get::<_, i64>(3)? as i32,
                row.get::<_, Option<String>>(4)?,
            ))
        })?;
        for binding in bindings {
            let (category_id, attribute_id, required, sort_order, allowed_raw) = binding?;
            let allowed_values = match allowed_raw {
                Some(json) => Some(serde_json::from_str::<Vec<String>>(&json).map_err(|e| {
                    RepositoryError::FieldValueError {
                        field: "category_attributes.allowed_values".to_string(),
                        message: e.to_string(),
                    }
                })?),
                None => None,
            };
            cache
                .category_attributes
                .entry(category_id.clone())
                .or_default()
                .push(CategoryAttribute {
                    category_id,
                    attribute_id,
                    required,
                    sort_order,
                    allowed_values,
                });
        }

        Ok(cache)
    }

    async fn load_existing_products(
        &self,
        skus: &[String],
    ) -> RepositoryResult<HashMap<String, ExistingProduct>> {
        let conn = self.lock()?;
        let mut result = HashMap::new();

        for sku in skus {
            let product_id: Option<String> = conn
                .query_row(
                    "SELECT id FROM products WHERE sku = ?1",
                    params![sku],
                    |row| row.get(0),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(RepositoryError::from(other)),
                })?;

            let Some(product_id) = product_id else {
                continue;
            };

            let mut existing = ExistingProduct {
                id: product_id.clone(),
                ..Default::default()
            };

            let mut stmt = conn.prepare(
                r#"
                SELECT v.id, v.variant_sku, v.color, v.size, v.mrp, v.selling_price, v.barcode,
                       COALESCE(i.quantity, 0), COALESCE(i.reserved_quantity, 0), COALESCE(i.reorder_level, 0)
                FROM product_variants v
                LEFT JOIN inventory i ON i.variant_id = v.id
                WHERE v.product_id = ?1
                "#,
            )?;
            let variants = stmt.query_map(params![product_id], |row| {
                Ok(ExistingVariant {
                    id: row.get(0)?,
                    variant_sku: row.get(1)?,
                    color: row.get(2)?,
                    size: row.get(3)?,
                    mrp: row.get(4)?,
                    selling_price: row.get(5)?,
                    barcode: row.get(6)?,
                    inventory: Inventory {
                        quantity: row.get(7)?,
                        reserved_quantity: row.get(8)?,
                        reorder_level: row.get(9)?,
                    },
                })
            })?;
            for variant in variants {
                let variant = variant?;
                existing
                    .variants
                    .insert(variant.variant_sku.clone(), variant);
            }

            let mut stmt = conn.prepare(
                "SELECT image_url, sort_order FROM product_images WHERE product_id = ?1 ORDER BY sort_order",
            )?;
            let images = stmt.query_map(params![product_id], |row| {
                Ok(ProductImage {
                    image_url: row.get(0)?,
                    sort_order: row.get::<_, i64>(1)? as i32,
                })
            })?;
            for image in images {
                existing.images.push(image?);
            }

            let mut stmt = conn.prepare(
                r#"
                SELECT attribute_id, value_text, value_number, value_boolean, value_date, value_json
                FROM product_attribute_values
                WHERE product_id = ?1
                "#,
            )?;
            let values = stmt.query_map(params![product_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            })?;
            for value in values {
                let (attribute_id, text, number, boolean, date, json) = value?;
                let typed = Self::read_attribute_value(text, number, boolean, date, json)?;
                existing.attribute_values.insert(attribute_id, typed);
            }

            result.insert(sku.clone(), existing);
        }

        Ok(result)
    }

    async fn apply_intent(
        &self,
        intent: &ProductWriteIntent,
        dry_run: bool,
    ) -> RepositoryResult<()> {
        let mut conn = self.lock()?;
        let now = Utc::now().to_rfc3339();

        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let product_id = Self::upsert_product_tx(&tx, intent, &now)?;
        Self::apply_attribute_upserts_tx(&tx, &product_id, &intent.attribute_upserts, &now)?;
        Self::apply_variant_diff_tx(&tx, &product_id, intent, &now)?;
        Self::apply_image_diff_tx(&tx, &product_id, intent)?;

        if dry_run {
            tx.rollback()
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        } else {
            tx.commit()
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        }

        Ok(())
    }
}
