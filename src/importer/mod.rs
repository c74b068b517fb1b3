// ==========================================
// Ingestion - file reading layer
// ==========================================
// Responsibility: turn an uploaded CSV/Excel file into canonical rows.
// Red line: no validation, no database access.
// ==========================================

pub mod error;
pub mod file_parser;
pub mod normalizer;

pub use error::{IngestError, IngestResult};
pub use file_parser::{CsvParser, ExcelParser, RawTable, UniversalFileParser};
pub use normalizer::{ColumnNormalizer, ATTR_PREFIX, CANONICAL_FIELDS};
