// ==========================================
// Catalog store - SQLite connection setup
// ==========================================
// Goals:
// - one place for Connection::open PRAGMA behavior, so every module
//   runs with foreign keys enabled
// - unified busy_timeout to reduce spurious busy errors when runs overlap
// - idempotent schema bootstrap for the CLI and tests
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// Default busy_timeout (milliseconds).
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Apply the unified PRAGMA set to a connection.
///
/// foreign_keys and busy_timeout are per-connection settings and must be
/// re-applied on every open.
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// Open a SQLite connection with the unified configuration.
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// Create the catalog schema if it does not exist.
///
/// Idempotent: every statement is IF NOT EXISTS, so the CLI can run it on
/// every start. The ingestion engine writes products, product_variants,
/// inventory, product_images and product_attribute_values; categories,
/// attributes and category_attributes are reference data; qc_logs belongs
/// to the QC workflow and is never written here.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            slug        TEXT NOT NULL UNIQUE,
            parent_id   TEXT REFERENCES categories(id),
            active      INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS attributes (
            id          TEXT PRIMARY KEY,
            code        TEXT NOT NULL UNIQUE,
            name        TEXT NOT NULL,
            value_type  TEXT NOT NULL CHECK (value_type IN ('TEXT','NUMBER','BOOLEAN','DATE','JSON'))
        );

        CREATE TABLE IF NOT EXISTS category_attributes (
            category_id     TEXT NOT NULL REFERENCES categories(id),
            attribute_id    TEXT NOT NULL REFERENCES attributes(id),
            required        INTEGER NOT NULL DEFAULT 0,
            sort_order      INTEGER NOT NULL DEFAULT 0,
            allowed_values  TEXT,
            PRIMARY KEY (category_id, attribute_id)
        );

        CREATE TABLE IF NOT EXISTS products (
            id                 TEXT PRIMARY KEY,
            sku                TEXT NOT NULL UNIQUE,
            category_id        TEXT NOT NULL REFERENCES categories(id),
            name               TEXT NOT NULL,
            description        TEXT,
            brand              TEXT,
            hsn_code           TEXT,
            mrp                REAL NOT NULL CHECK (mrp >= 0),
            selling_price      REAL NOT NULL CHECK (selling_price >= 0 AND selling_price <= mrp),
            currency           TEXT NOT NULL DEFAULT 'INR',
            primary_image_url  TEXT,
            qc_status          TEXT NOT NULL DEFAULT 'PENDING'
                               CHECK (qc_status IN ('PENDING','APPROVED','REJECTED')),
            qc_reason          TEXT,
            approved_by        TEXT,
            approved_at        TEXT,
            created_at         TEXT NOT NULL,
            updated_at         TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS product_variants (
            id             TEXT PRIMARY KEY,
            product_id     TEXT NOT NULL REFERENCES products(id),
            variant_sku    TEXT NOT NULL UNIQUE,
            color          TEXT,
            size           TEXT,
            mrp            REAL CHECK (mrp IS NULL OR mrp >= 0),
            selling_price  REAL CHECK (selling_price IS NULL OR selling_price >= 0),
            barcode        TEXT,
            created_at     TEXT NOT NULL,
            updated_at     TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS inventory (
            variant_id         TEXT PRIMARY KEY REFERENCES product_variants(id) ON DELETE CASCADE,
            quantity           INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
            reserved_quantity  INTEGER NOT NULL DEFAULT 0 CHECK (reserved_quantity >= 0),
            reorder_level      INTEGER NOT NULL DEFAULT 0 CHECK (reorder_level >= 0),
            updated_at         TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS product_images (
            id          TEXT PRIMARY KEY,
            product_id  TEXT NOT NULL REFERENCES products(id),
            image_url   TEXT NOT NULL,
            sort_order  INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS product_attribute_values (
            product_id     TEXT NOT NULL REFERENCES products(id),
            attribute_id   TEXT NOT NULL REFERENCES attributes(id),
            value_text     TEXT,
            value_number   REAL,
            value_boolean  INTEGER,
            value_date     TEXT,
            value_json     TEXT,
            updated_at     TEXT NOT NULL,
            PRIMARY KEY (product_id, attribute_id)
        );

        CREATE TABLE IF NOT EXISTS qc_logs (
            id               TEXT PRIMARY KEY,
            product_id       TEXT NOT NULL REFERENCES products(id),
            previous_status  TEXT NOT NULL,
            new_status       TEXT NOT NULL,
            reason           TEXT,
            reviewed_by      TEXT,
            created_at       TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_products_category ON products(category_id);
        CREATE INDEX IF NOT EXISTS idx_products_qc_status ON products(qc_status);
        CREATE INDEX IF NOT EXISTS idx_variants_product ON product_variants(product_id);
        "#,
    )?;
    Ok(())
}
