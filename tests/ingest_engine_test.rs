// ==========================================
// Ingestion engine - end-to-end tests
// ==========================================
// Drives CatalogIngestor against a real temporary SQLite store:
// file parsing, header aliasing, validation gating, diff-based upserts,
// per-product transaction isolation, dry-run and exit codes.
// ==========================================


use catalog_ingest::{
    db, CatalogIngestor, CatalogRepositoryImpl, IngestError, ProductState, EXIT_OK,
    EXIT_VALIDATION_ERRORS, EXIT_WRITE_FAILURES,
};
use rusqlite::params;
use std::sync::Arc;
use tempfile::NamedTempFile;
use test_helpers::{count_rows, create_test_db, product_field, write_upload_csv};

// ==========================================
// Helper: database + ingestor
// ==========================================
fn setup() -> (NamedTempFile, String, CatalogIngestor) {
    let (temp_file, db_path) = create_test_db().expect("create test db");
    let repo = CatalogRepositoryImpl::new(&db_path).expect("open repository");
    let ingestor = CatalogIngestor::new(Arc::new(repo));
    (temp_file, db_path, ingestor)
}

const UPLOAD_HEADER: &str =
    "sku,category_code,name,brand,mrp,selling_price,images,variant_sku,size,color,quantity,attr_material,attr_heel_height";

fn two_variant_upload() -> NamedTempFile {
    write_upload_csv(&[
        UPLOAD_HEADER,
        "WK-001,womens-footwear,Elegant Heels,Stride,999,899,a.jpg|b.jpg,WK-001-38,38,Black,25,Leather,7.5",
        "WK-001,womens-footwear,Elegant Heels,Stride,999,899,a.jpg|b.jpg,WK-001-39,39,Black,10,Leather,7.5",
    ])
    .expect("write upload csv")
}

// ==========================================
// Happy path
// ==========================================
#[tokio::test]
async fn test_full_ingest_writes_product_variants_images_attributes() {
    let (_db_file, db_path, ingestor) = setup();
    let upload = two_variant_upload();
    let file_path = upload.path().to_str().unwrap();

    let report = ingestor.ingest(file_path, Some("ops"), false).await.unwrap();

    assert_eq!(report.exit_code(), EXIT_OK);
    assert_eq!(report.rows_read, 2);
    assert_eq!(report.rows_valid, 2);
    assert_eq!(report.products_planned, 1);
    assert_eq!(report.products_written, 1);
    assert!(report.row_errors.is_empty());
    assert_eq!(report.operator.as_deref(), Some("ops"));

    assert_eq!(count_rows(&db_path, "products").unwrap(), 1);
    assert_eq!(count_rows(&db_path, "product_variants").unwrap(), 2);
    assert_eq!(count_rows(&db_path, "inventory").unwrap(), 2);
    assert_eq!(count_rows(&db_path, "product_images").unwrap(), 2);
    assert_eq!(count_rows(&db_path, "product_attribute_values").unwrap(), 2);

    // first image becomes the primary, new products start PENDING
    assert_eq!(
        product_field(&db_path, "WK-001", "primary_image_url").unwrap(),
        "a.jpg"
    );
    assert_eq!(
        product_field(&db_path, "WK-001", "qc_status").unwrap(),
        "PENDING"
    );
}

#[tokio::test]
async fn test_reingest_of_same_file_is_idempotent() {
    let (_db_file, db_path, ingestor) = setup();
    let upload = two_variant_upload();
    let file_path = upload.path().to_str().unwrap();

    let first = ingestor.ingest(file_path, None, false).await.unwrap();
    let second = ingestor.ingest(file_path, None, false).await.unwrap();

    assert_eq!(first.exit_code(), EXIT_OK);
    assert_eq!(second.exit_code(), EXIT_OK);
    assert_eq!(second.products_written, 1);

    // no duplicated rows anywhere
    assert_eq!(count_rows(&db_path, "products").unwrap(), 1);
    assert_eq!(count_rows(&db_path, "product_variants").unwrap(), 2);
    assert_eq!(count_rows(&db_path, "inventory").unwrap(), 2);
    assert_eq!(count_rows(&db_path, "product_images").unwrap(), 2);
    assert_eq!(count_rows(&db_path, "product_attribute_values").unwrap(), 2);
}

#[tokio::test]
async fn test_snake_and_camel_headers_ingest_identically() {
    let (_f1, db_snake, _) = setup();
    let (_f2, db_camel, _) = setup();

    let snake = write_upload_csv(&[
        "sku,category_code,name,mrp,selling_price,variant_sku,quantity,attr_material",
        "WK-010,womens-footwear,City Flats,799,699,WK-010-37,5,Canvas",
    ])
    .unwrap();
    let camel = write_upload_csv(&[
        "sku,categoryCode,name,mrp,sellingPrice,variantSku,quantity,attr_material",
        "WK-010,womens-footwear,City Flats,799,699,WK-010-37,5,Canvas",
    ])
    .unwrap();

    for (db_path, upload) in [(&db_snake, &snake), (&db_camel, &camel)] {
        let repo = CatalogRepositoryImpl::new(db_path).unwrap();
        let ingestor = CatalogIngestor::new(Arc::new(repo));
        let report = ingestor
            .ingest(upload.path().to_str().unwrap(), None, false)
            .await
            .unwrap();
        assert_eq!(report.exit_code(), EXIT_OK);
        assert_eq!(report.products_written, 1);
    }

    assert_eq!(
        product_field(&db_snake, "WK-010", "name").unwrap(),
        product_field(&db_camel, "WK-010", "name").unwrap()
    );
    assert_eq!(count_rows(&db_snake, "product_variants").unwrap(), 1);
    assert_eq!(count_rows(&db_camel, "product_variants").unwrap(), 1);
}

// ==========================================
// Validation gate
// ==========================================
#[tokio::test]
async fn test_price_order_error_blocks_whole_batch() {
    let (_db_file, db_path, ingestor) = setup();
    // row 2 is bad (selling price above MRP), row 3 is fine; neither writes
    let upload = write_upload_csv(&[
        "sku,category_code,name,mrp,selling_price,attr_material",
        "WK-020,womens-footwear,Elegant Heels,999,1200,Leather",
        "WK-021,womens-footwear,City Flats,799,699,Canvas",
    ])
    .unwrap();

    let report = ingestor
        .ingest(upload.path().to_str().unwrap(), None, false)
        .await
        .unwrap();

    assert_eq!(report.exit_code(), EXIT_VALIDATION_ERRORS);
    assert_eq!(report.rows_read, 2);
    assert_eq!(report.rows_valid, 1);
    assert_eq!(report.rows_rejected, 1);
    assert_eq!(report.products_planned, 0);
    assert_eq!(report.rejected_by_kind.get("price_order"), Some(&1));
    assert_eq!(report.row_errors[0].row_number, 2);
    assert_eq!(report.row_errors[0].sku.as_deref(), Some("WK-020"));

    // zero writes attempted, the valid row included
    assert_eq!(count_rows(&db_path, "products").unwrap(), 0);
}

#[tokio::test]
async fn test_inactive_category_is_a_blocking_reference_error() {
    let (_db_file, db_path, ingestor) = setup();
    let upload = write_upload_csv(&[
        "sku,category_code,name,mrp,selling_price,attr_material",
        "WK-030,clearance,Old Stock Boots,500,400,Leather",
    ])
    .unwrap();

    let report = ingestor
        .ingest(upload.path().to_str().unwrap(), None, false)
        .await
        .unwrap();

    assert_eq!(report.exit_code(), EXIT_VALIDATION_ERRORS);
    assert_eq!(report.rejected_by_kind.get("reference_category"), Some(&1));
    assert_eq!(count_rows(&db_path, "products").unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_attribute_cell_skipped_without_blocking() {
    let (_db_file, db_path, ingestor) = setup();
    let upload = write_upload_csv(&[
        "sku,category_code,name,mrp,selling_price,attr_material,attr_unknowncode",
        "WK-040,womens-footwear,Elegant Heels,999,899,Leather,whatever",
    ])
    .unwrap();

    let report = ingestor
        .ingest(upload.path().to_str().unwrap(), None, false)
        .await
        .unwrap();

    // the cell is excluded, the product still ingests
    assert_eq!(report.exit_code(), EXIT_OK);
    assert_eq!(report.products_written, 1);
    assert_eq!(report.rows_rejected, 0);
    assert_eq!(report.rejected_by_kind.get("reference_attribute"), Some(&1));
    assert_eq!(count_rows(&db_path, "products").unwrap(), 1);
    assert_eq!(count_rows(&db_path, "product_attribute_values").unwrap(), 1);
}

// ==========================================
// Write-phase isolation
// ==========================================
#[tokio::test]
async fn test_write_failure_isolates_one_product() {
    let (_db_file, db_path, ingestor) = setup();

    // occupy a variant sku under an existing product
    let seed = write_upload_csv(&[
        "sku,category_code,name,mrp,selling_price,variant_sku,quantity,attr_material",
        "WK-100,womens-footwear,Seeded Heels,999,899,SHARED-38,5,Leather",
    ])
    .unwrap();
    let report = ingestor
        .ingest(seed.path().to_str().unwrap(), None, false)
        .await
        .unwrap();
    assert_eq!(report.exit_code(), EXIT_OK);

    // WK-200 collides on the globally unique variant sku; WK-300 is clean
    let upload = write_upload_csv(&[
        "sku,category_code,name,mrp,selling_price,variant_sku,quantity,attr_material",
        "WK-200,womens-footwear,Colliding Heels,999,899,SHARED-38,5,Leather",
        "WK-300,womens-footwear,Clean Flats,799,699,WK-300-38,5,Canvas",
    ])
    .unwrap();
    let report = ingestor
        .ingest(upload.path().to_str().unwrap(), None, false)
        .await
        .unwrap();

    assert_eq!(report.exit_code(), EXIT_WRITE_FAILURES);
    assert_eq!(report.products_planned, 2);
    assert_eq!(report.products_written, 1);
    assert_eq!(report.products_failed, 1);
    assert_eq!(report.write_errors.len(), 1);
    assert_eq!(report.write_errors[0].sku, "WK-200");

    // the failed product rolled back whole, the clean one committed
    assert_eq!(count_rows(&db_path, "products").unwrap(), 2); // WK-100 + WK-300
    assert!(product_field(&db_path, "WK-200", "name").is_err());
    assert_eq!(
        product_field(&db_path, "WK-300", "name").unwrap(),
        "Clean Flats"
    );
}

// ==========================================
// Dry run
// ==========================================
#[tokio::test]
async fn test_dry_run_reports_without_persisting() {
    let (_db_file, db_path, ingestor) = setup();
    let upload = two_variant_upload();

    let report = ingestor
        .ingest(upload.path().to_str().unwrap(), None, true)
        .await
        .unwrap();

    assert_eq!(report.exit_code(), EXIT_OK);
    assert!(report.dry_run);
    assert_eq!(report.products_would_write, 1);
    assert_eq!(report.products_written, 0);
    assert!(report
        .products
        .iter()
        .all(|p| p.state == ProductState::WouldWrite));

    assert_eq!(count_rows(&db_path, "products").unwrap(), 0);
    assert_eq!(count_rows(&db_path, "product_variants").unwrap(), 0);
    assert_eq!(count_rows(&db_path, "product_images").unwrap(), 0);
}

// ==========================================
// Resubmission semantics
// ==========================================
#[tokio::test]
async fn test_resubmission_preserves_qc_fields() {
    let (_db_file, db_path, ingestor) = setup();
    let upload = two_variant_upload();
    let file_path = upload.path().to_str().unwrap();
    ingestor.ingest(file_path, None, false).await.unwrap();

    // QC workflow approves the product out of band
    {
        let conn = db::open_sqlite_connection(&db_path).unwrap();
        conn.execute(
            "UPDATE products SET qc_status = 'APPROVED', approved_by = 'qc-lead' WHERE sku = ?1",
            params!["WK-001"],
        )
        .unwrap();
    }

    // resubmission with a new name: content refreshes, QC decision stays
    let resubmit = write_upload_csv(&[
        "sku,category_code,name,mrp,selling_price,attr_material",
        "WK-001,womens-footwear,Elegant Heels v2,999,899,Leather",
    ])
    .unwrap();
    let report = ingestor
        .ingest(resubmit.path().to_str().unwrap(), None, false)
        .await
        .unwrap();

    assert_eq!(report.exit_code(), EXIT_OK);
    assert_eq!(
        product_field(&db_path, "WK-001", "name").unwrap(),
        "Elegant Heels v2"
    );
    assert_eq!(
        product_field(&db_path, "WK-001", "qc_status").unwrap(),
        "APPROVED"
    );
    assert_eq!(
        product_field(&db_path, "WK-001", "approved_by").unwrap(),
        "qc-lead"
    );
}

#[tokio::test]
async fn test_explicit_qc_status_cell_overrides() {
    let (_db_file, db_path, ingestor) = setup();
    let upload = two_variant_upload();
    ingestor
        .ingest(upload.path().to_str().unwrap(), None, false)
        .await
        .unwrap();
    {
        let conn = db::open_sqlite_connection(&db_path).unwrap();
        conn.execute(
            "UPDATE products SET qc_status = 'APPROVED' WHERE sku = ?1",
            params!["WK-001"],
        )
        .unwrap();
    }

    let resubmit = write_upload_csv(&[
        "sku,category_code,name,mrp,selling_price,qc_status,attr_material",
        "WK-001,womens-footwear,Elegant Heels,999,899,PENDING,Leather",
    ])
    .unwrap();
    ingestor
        .ingest(resubmit.path().to_str().unwrap(), None, false)
        .await
        .unwrap();

    assert_eq!(
        product_field(&db_path, "WK-001", "qc_status").unwrap(),
        "PENDING"
    );
}

#[tokio::test]
async fn test_variants_absent_from_resubmission_are_removed() {
    let (_db_file, db_path, ingestor) = setup();
    let upload = two_variant_upload();
    ingestor
        .ingest(upload.path().to_str().unwrap(), None, false)
        .await
        .unwrap();
    assert_eq!(count_rows(&db_path, "product_variants").unwrap(), 2);

    // only size 38 remains in the resubmitted file
    let resubmit = write_upload_csv(&[
        UPLOAD_HEADER,
        "WK-001,womens-footwear,Elegant Heels,Stride,999,899,a.jpg|b.jpg,WK-001-38,38,Black,30,Leather,7.5",
    ])
    .unwrap();
    let report = ingestor
        .ingest(resubmit.path().to_str().unwrap(), None, false)
        .await
        .unwrap();

    assert_eq!(report.exit_code(), EXIT_OK);
    assert_eq!(count_rows(&db_path, "product_variants").unwrap(), 1);
    // the paired inventory row cascaded away with the deleted variant
    assert_eq!(count_rows(&db_path, "inventory").unwrap(), 1);

    let conn = db::open_sqlite_connection(&db_path).unwrap();
    let quantity: i64 = conn
        .query_row(
            "SELECT i.quantity FROM inventory i
             JOIN product_variants v ON v.id = i.variant_id
             WHERE v.variant_sku = 'WK-001-38'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(quantity, 30);
}

// ==========================================
// Fatal conditions
// ==========================================
#[tokio::test]
async fn test_missing_file_is_fatal() {
    let (_db_file, _db_path, ingestor) = setup();
    let result = ingestor.ingest("no_such_upload.csv", None, false).await;
    assert!(matches!(result, Err(IngestError::FileNotFound(_))));
}

#[tokio::test]
async fn test_unsupported_extension_is_fatal() {
    let (_db_file, _db_path, ingestor) = setup();
    let result = ingestor.ingest("products.pdf", None, false).await;
    assert!(matches!(result, Err(IngestError::UnsupportedFormat(_))));
}
