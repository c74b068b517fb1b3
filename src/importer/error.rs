// ==========================================
// Ingestion - fatal error types
// ==========================================
// Only file-format and connection-level failures abort a run; row and
// cell errors are collected into the report instead (domain::ingest).
// Tool: thiserror derive macros.
// ==========================================

use thiserror::Error;

/// Fatal ingestion errors.
#[derive(Error, Debug)]
pub enum IngestError {
    // ===== file format errors (abort before any row is processed) =====
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("unsupported file format: {0} (only .csv/.xls/.xlsx)")]
    UnsupportedFormat(String),

    #[error("file read failed: {0}")]
    FileReadError(String),

    #[error("CSV parse failed: {0}")]
    CsvParseError(String),

    #[error("Excel parse failed: {0}")]
    ExcelParseError(String),

    // ===== connection errors (abort the remaining run) =====
    #[error("database unreachable: {0}")]
    DatabaseConnection(String),

    // ===== generic =====
    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IngestError {
    /// True for the FormatError family (unreadable/unsupported file).
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            IngestError::FileNotFound(_)
                | IngestError::UnsupportedFormat(_)
                | IngestError::FileReadError(_)
                | IngestError::CsvParseError(_)
                | IngestError::ExcelParseError(_)
        )
    }
}

impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        IngestError::FileReadError(err.to_string())
    }
}

impl From<csv::Error> for IngestError {
    fn from(err: csv::Error) -> Self {
        IngestError::CsvParseError(err.to_string())
    }
}

impl From<calamine::Error> for IngestError {
    fn from(err: calamine::Error) -> Self {
        IngestError::ExcelParseError(err.to_string())
    }
}

/// Result alias for the ingestion pipeline.
pub type IngestResult<T> = Result<T, IngestError>;
