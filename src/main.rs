// ==========================================
// catalog-ingest - CLI entry point
// ==========================================
// Usage:
//   catalog-ingest --file products.xlsx --db catalog.db [--dry-run] [--operator NAME]
//
// Exit codes:
//   0  all rows valid and all products written
//   1  validation errors exist, zero writes attempted
//   2  all rows valid but one or more products failed at write time
//   3  fatal (file unreadable/unsupported, database unreachable)
// ==========================================

use catalog_ingest::engine::EXIT_FATAL;
use catalog_ingest::{db, logging, CatalogIngestor, CatalogRepositoryImpl};
use std::process::ExitCode;
use std::sync::Arc;

struct CliArgs {
    file: String,
    db: String,
    dry_run: bool,
    operator: Option<String>,
}

fn print_usage() {
    eprintln!("Bulk catalog ingestion engine");
    eprintln!();
    eprintln!("Usage: catalog-ingest --file <path> --db <path> [--dry-run] [--operator <name>]");
    eprintln!();
    eprintln!("  --file <path>      CSV/XLS/XLSX file to ingest");
    eprintln!("  --db <path>        SQLite catalog database");
    eprintln!("  --dry-run          validate and plan, roll back every write");
    eprintln!("  --operator <name>  tag the run report with an operator name");
}

fn parse_args() -> Result<CliArgs, String> {
    let mut file = None;
    let mut db = None;
    let mut dry_run = false;
    let mut operator = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--file" => file = args.next(),
            "--db" => db = args.next(),
            "--dry-run" => dry_run = true,
            "--operator" => operator = args.next(),
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {}", other)),
        }
    }

    Ok(CliArgs {
        file: file.ok_or("--file is required")?,
        db: db.ok_or("--db is required")?,
        dry_run,
        operator,
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("error: {}", message);
            eprintln!();
            print_usage();
            return ExitCode::from(EXIT_FATAL as u8);
        }
    };

    tracing::info!(
        version = catalog_ingest::VERSION,
        file = %args.file,
        db = %args.db,
        dry_run = args.dry_run,
        "catalog-ingest starting"
    );

    // Bootstrap the schema so a fresh database path just works; every
    // statement is IF NOT EXISTS.
    match db::open_sqlite_connection(&args.db) {
        Ok(conn) => {
            if let Err(e) = db::init_schema(&conn) {
                tracing::error!(error = %e, "schema initialization failed");
                return ExitCode::from(EXIT_FATAL as u8);
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "database unreachable");
            return ExitCode::from(EXIT_FATAL as u8);
        }
    }

    let repo = match CatalogRepositoryImpl::new(&args.db) {
        Ok(repo) => Arc::new(repo),
        Err(e) => {
            tracing::error!(error = %e, "database unreachable");
            return ExitCode::from(EXIT_FATAL as u8);
        }
    };

    let ingestor = CatalogIngestor::new(repo);
    let report = match ingestor
        .ingest(&args.file, args.operator.as_deref(), args.dry_run)
        .await
    {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, "fatal ingestion error");
            println!(
                "{}",
                serde_json::json!({ "ok": false, "error": e.to_string() })
            );
            return ExitCode::from(EXIT_FATAL as u8);
        }
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            tracing::error!(error = %e, "report serialization failed");
            return ExitCode::from(EXIT_FATAL as u8);
        }
    }

    ExitCode::from(report.exit_code() as u8)
}
