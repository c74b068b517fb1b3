// ==========================================
// Ingestion - file parsers
// ==========================================
// Supports: CSV (.csv) / Excel (.xlsx/.xls)
// Output: a RawTable (header row + data rows) that the Column
// Normalizer turns into canonical rows. Parsers never look at headers
// beyond trimming; alias resolution happens once, downstream.
// ==========================================

use crate::importer::error::{IngestError, IngestResult};
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;

// ==========================================
// RawTable - parsed tabular content
// ==========================================
/// Restartable tabular content: rows can be iterated any number of
/// times. Data rows are file rows 2.. (the header is row 1); fully
/// blank rows are dropped and keep their original numbering gap.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub headers: Vec<String>,
    /// (file row number, cells)
    pub rows: Vec<(usize, Vec<String>)>,
}

// ==========================================
// CSV parser
// ==========================================
pub struct CsvParser;

impl CsvParser {
    pub fn parse(&self, path: &Path) -> IngestResult<RawTable> {
        if !path.exists() {
            return Err(IngestError::FileNotFound(path.display().to_string()));
        }

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // tolerate ragged rows
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (row_idx, result) in reader.records().enumerate() {
            let record = result?;
            let cells: Vec<String> = record.iter().map(|v| v.trim().to_string()).collect();

            if cells.iter().all(|v| v.is_empty()) {
                continue;
            }

            // +2: row numbers are 1-based and row 1 is the header
            rows.push((row_idx + 2, cells));
        }

        Ok(RawTable { headers, rows })
    }
}

// ==========================================
// Excel parser
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    pub fn parse(&self, path: &Path) -> IngestResult<RawTable> {
        if !path.exists() {
            return Err(IngestError::FileNotFound(path.display().to_string()));
        }

        let mut workbook = open_workbook_auto(path)
            .map_err(|e| IngestError::ExcelParseError(e.to_string()))?;

        let sheet_names = workbook.sheet_names();
        if sheet_names.is_empty() {
            return Err(IngestError::ExcelParseError(
                "workbook has no sheets".to_string(),
            ));
        }

        // First sheet only; the upload template is single-sheet.
        let sheet_name = sheet_names[0].clone();
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| IngestError::ExcelParseError(e.to_string()))?;

        let mut sheet_rows = range.rows();
        let header_row = sheet_rows
            .next()
            .ok_or_else(|| IngestError::ExcelParseError("workbook has no data rows".to_string()))?;

        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (row_idx, data_row) in sheet_rows.enumerate() {
            let cells: Vec<String> = data_row
                .iter()
                .map(|cell| cell.to_string().trim().to_string())
                .collect();

            if cells.iter().all(|v| v.is_empty()) {
                continue;
            }

            rows.push((row_idx + 2, cells));
        }

        Ok(RawTable { headers, rows })
    }
}

// ==========================================
// Universal parser (dispatch on extension)
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> IngestResult<RawTable> {
        let path = file_path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => CsvParser.parse(path),
            "xlsx" | "xls" => ExcelParser.parse(path),
            _ => Err(IngestError::UnsupportedFormat(ext)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_csv_parser_valid_file() {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(temp_file, "sku,name,mrp").unwrap();
        writeln!(temp_file, "WK-001,Heels,999").unwrap();
        writeln!(temp_file, "WK-002,Flats,799").unwrap();
        temp_file.flush().unwrap();

        let table = CsvParser.parse(temp_file.path()).unwrap();
        assert_eq!(table.headers, vec!["sku", "name", "mrp"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].0, 2);
        assert_eq!(table.rows[0].1[0], "WK-001");
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let result = CsvParser.parse(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(IngestError::FileNotFound(_))));
    }

    #[test]
    fn test_csv_parser_skips_blank_rows_keeping_numbering() {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(temp_file, "sku,name").unwrap();
        writeln!(temp_file, "WK-001,Heels").unwrap();
        writeln!(temp_file, ",").unwrap();
        writeln!(temp_file, "WK-002,Flats").unwrap();
        temp_file.flush().unwrap();

        let table = CsvParser.parse(temp_file.path()).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].0, 4); // blank row 3 keeps its gap
    }

    #[test]
    fn test_universal_parser_rejects_unknown_extension() {
        let result = UniversalFileParser.parse("products.pdf");
        assert!(matches!(result, Err(IngestError::UnsupportedFormat(_))));
    }
}
