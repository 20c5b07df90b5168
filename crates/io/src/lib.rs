// Tabular file I/O: CSV/Excel ingestion and matrix workbook export

use std::path::Path;

use matproc_matrix::model::DataSet;

pub mod csv;
pub mod xlsx;

/// Load any supported input file, choosing the importer by extension:
/// delimited text for `.csv`/`.tsv`/`.txt`, calamine for everything else.
pub fn load(path: &Path) -> Result<DataSet, String> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if matches!(ext.to_ascii_lowercase().as_str(), "csv" | "tsv" | "txt") => {
            csv::import(path)
        }
        _ => xlsx::import(path),
    }
}
