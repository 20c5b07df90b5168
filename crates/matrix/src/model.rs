use std::collections::HashMap;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One parsed sheet: header names plus rows of trimmed string values.
/// Missing or blank cells read as the empty string.
#[derive(Debug, Clone, Serialize)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Csv,
    Spreadsheet,
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Spreadsheet => write!(f, "spreadsheet"),
        }
    }
}

/// One ingested file: an ordered sequence of sheets.
#[derive(Debug, Clone, Serialize)]
pub struct DataSet {
    pub file_name: String,
    pub file_type: FileType,
    pub sheets: Vec<Sheet>,
}

impl DataSet {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// File name without its final extension, used for per-source matrix names.
    pub fn base_name(&self) -> &str {
        match self.file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.file_name,
        }
    }
}

/// Pre-loaded datasets plus the optional filter dataset.
#[derive(Debug, Default)]
pub struct ComputeInput {
    pub datasets: Vec<DataSet>,
    pub filter_data: Option<DataSet>,
}

// ---------------------------------------------------------------------------
// Source addressing
// ---------------------------------------------------------------------------

/// `(file_index, sheet_name)` pair identifying one contributing sheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceRef {
    pub file_index: usize,
    pub sheet_name: String,
}

impl SourceRef {
    /// The per-source configuration key, `"{file_index}-{sheet_name}"`.
    pub fn key(&self) -> String {
        format!("{}-{}", self.file_index, self.sheet_name)
    }

    /// Parse a compact source key back into its parts. The index never
    /// contains `-`, so the first one splits the key; sheet names may
    /// contain further dashes.
    pub fn parse_key(key: &str) -> Option<SourceRef> {
        let (index, sheet) = key.split_once('-')?;
        let file_index = index.trim().parse().ok()?;
        if sheet.is_empty() {
            return None;
        }
        Some(SourceRef {
            file_index,
            sheet_name: sheet.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One computed intersection matrix. `grid[i][j] == 1` iff at least one
/// contributing row, after filtering, ties `row_labels[i]` to `col_labels[j]`.
/// Label sequences are sorted, unique, and free of empty strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Matrix {
    pub name: String,
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    pub grid: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub matrices: usize,
    pub cells_set: usize,
    pub groups_skipped: usize,
    pub sources_skipped: usize,
}

/// Ordered matrices plus run metadata, in config order.
#[derive(Debug, Clone, Serialize)]
pub struct MatrixSet {
    pub meta: RunMeta,
    pub summary: RunSummary,
    pub matrices: Vec<Matrix>,
}
