// Excel ingestion (calamine) and matrix workbook export (rust_xlsxwriter)

use std::collections::{HashMap, HashSet};
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use rust_xlsxwriter::{Color, Format, Workbook as XlsxWorkbook};

use matproc_matrix::model::{DataSet, FileType, MatrixSet, Sheet};

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Import an Excel file (xlsx, xls, xlsb, ods). Every sheet is read; the
/// first row of the used range supplies the headers.
pub fn import(path: &Path) -> Result<DataSet, String> {
    let mut workbook: Sheets<_> =
        open_workbook_auto(path).map_err(|e| format!("failed to open Excel file: {e}"))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err("Excel file contains no sheets".to_string());
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.xlsx")
        .to_string();

    let mut sheets = Vec::new();
    for sheet_name in &sheet_names {
        let range = workbook
            .worksheet_range(sheet_name)
            .map_err(|e| format!("failed to read sheet '{sheet_name}': {e}"))?;

        let mut range_rows = range.rows();
        let headers = match range_rows.next() {
            Some(first) => crate::csv::dedup_headers(first.iter().map(cell_to_string)),
            None => {
                // Empty sheets are kept so source indices stay stable.
                sheets.push(Sheet {
                    name: sheet_name.clone(),
                    headers: Vec::new(),
                    rows: Vec::new(),
                });
                continue;
            }
        };

        let mut rows = Vec::new();
        for row in range_rows {
            let mut mapped = HashMap::with_capacity(headers.len());
            for (i, header) in headers.iter().enumerate() {
                let value = row.get(i).map(cell_to_string).unwrap_or_default();
                mapped.insert(header.clone(), value);
            }
            rows.push(mapped);
        }

        sheets.push(Sheet {
            name: sheet_name.clone(),
            headers,
            rows,
        });
    }

    Ok(DataSet {
        file_name,
        file_type: FileType::Spreadsheet,
        sheets,
    })
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(n) => {
            // Integers render without decimals
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => format!("{}", n),
        Data::Bool(b) => {
            if *b {
                "TRUE".to_string()
            } else {
                "FALSE".to_string()
            }
        }
        Data::Error(e) => format!("#{:?}", e),
        Data::DateTime(dt) => {
            // Serial representation; calamine's 1904 handling stays internal
            let serial = dt.as_f64();
            if serial.fract() == 0.0 {
                format!("{}", serial as i64)
            } else {
                format!("{}", serial)
            }
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ExportResult {
    pub sheets_exported: usize,
    pub cells_written: usize,
}

/// Write one worksheet per matrix: column labels across the top, row labels
/// down the first column, 0/1 cells with set cells highlighted. Labels are
/// written in engine order; export never reorders them.
pub fn export(set: &MatrixSet, path: &Path) -> Result<ExportResult, String> {
    let mut result = ExportResult::default();
    let mut workbook = XlsxWorkbook::new();

    let header_format = Format::new().set_bold();
    let hit_format = Format::new().set_background_color(Color::RGB(0xC6EFCE));

    let mut used_names: HashSet<String> = HashSet::new();

    for matrix in &set.matrices {
        let sheet_name = unique_sheet_name(&matrix.name, &used_names);
        used_names.insert(sheet_name.clone());

        let worksheet = workbook
            .add_worksheet()
            .set_name(&sheet_name)
            .map_err(|e| format!("failed to create sheet '{sheet_name}': {e}"))?;

        for (col, label) in matrix.col_labels.iter().enumerate() {
            worksheet
                .write_with_format(0, (col + 1) as u16, label.as_str(), &header_format)
                .map_err(|e| format!("failed to write column header: {e}"))?;
        }

        for (row, label) in matrix.row_labels.iter().enumerate() {
            worksheet
                .write_with_format((row + 1) as u32, 0, label.as_str(), &header_format)
                .map_err(|e| format!("failed to write row label: {e}"))?;

            for (col, &value) in matrix.grid[row].iter().enumerate() {
                let cell_row = (row + 1) as u32;
                let cell_col = (col + 1) as u16;
                if value == 1 {
                    worksheet
                        .write_with_format(cell_row, cell_col, 1u32, &hit_format)
                        .map_err(|e| format!("failed to write cell: {e}"))?;
                } else {
                    worksheet
                        .write(cell_row, cell_col, 0u32)
                        .map_err(|e| format!("failed to write cell: {e}"))?;
                }
                result.cells_written += 1;
            }
        }

        worksheet
            .set_freeze_panes(1, 1)
            .map_err(|e| format!("failed to freeze panes: {e}"))?;
        worksheet
            .set_column_width(0, 24)
            .map_err(|e| format!("failed to size label column: {e}"))?;

        result.sheets_exported += 1;
    }

    workbook
        .save(path)
        .map_err(|e| format!("failed to save XLSX file: {e}"))?;

    Ok(result)
}

/// Cap a matrix name to Excel's 31-character sheet limit and replace the
/// reserved characters. Blank results fall back to `Matrix`.
pub fn sanitize_sheet_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .take(31)
        .map(|c| match c {
            '\\' | '/' | '*' | '?' | ':' | '[' | ']' => '_',
            other => other,
        })
        .collect();
    if sanitized.trim().is_empty() {
        return "Matrix".to_string();
    }
    sanitized
}

/// Sanitized name, deduplicated with a numeric suffix so every matrix keeps
/// its own tab even when truncation collides.
fn unique_sheet_name(name: &str, used: &HashSet<String>) -> String {
    let base = sanitize_sheet_name(name);
    if !used.contains(&base) {
        return base;
    }

    let mut n = 2;
    loop {
        let suffix = format!(" ({n})");
        let keep = 31usize.saturating_sub(suffix.chars().count());
        let mut candidate: String = base.chars().take(keep).collect();
        candidate.push_str(&suffix);
        if !used.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
