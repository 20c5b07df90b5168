// Delimited-text ingestion

use std::collections::HashMap;
use std::path::Path;

use matproc_matrix::model::{DataSet, FileType, Sheet};

/// Import a delimited text file as a single-sheet dataset named `Sheet1`.
/// The first record supplies the headers; every value is trimmed.
pub fn import(path: &Path) -> Result<DataSet, String> {
    let content = read_text(path)?;
    let delimiter = sniff_delimiter(&content);
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.csv");
    import_from_string(file_name, &content, delimiter)
}

pub fn import_from_string(
    file_name: &str,
    content: &str,
    delimiter: u8,
) -> Result<DataSet, String> {
    // Excel-exported CSVs often lead with a UTF-8 BOM
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();

    let headers = match records.next() {
        Some(first) => {
            let first = first.map_err(|e| e.to_string())?;
            dedup_headers(first.iter().map(|h| h.to_string()))
        }
        None => return Err("file contains no data".to_string()),
    };

    let mut rows: Vec<HashMap<String, String>> = Vec::new();
    for record in records {
        let record = record.map_err(|e| e.to_string())?;
        let mut row = HashMap::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            let value = record.get(i).unwrap_or("").trim().to_string();
            row.insert(header.clone(), value);
        }
        rows.push(row);
    }

    Ok(DataSet {
        file_name: file_name.to_string(),
        file_type: FileType::Csv,
        sheets: vec![Sheet {
            name: "Sheet1".to_string(),
            headers,
            rows,
        }],
    })
}

/// Make header names unique and non-blank: blanks become `Column{n}`,
/// repeats get a numeric suffix.
pub(crate) fn dedup_headers<I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut headers = Vec::new();
    for (i, name) in raw.into_iter().enumerate() {
        let name = name.trim().to_string();
        let base = if name.is_empty() {
            format!("Column{}", i + 1)
        } else {
            name
        };
        let count = seen.entry(base.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            headers.push(base);
        } else {
            headers.push(format!("{} ({})", base, count));
        }
    }
    headers
}

/// Guess the field delimiter of an exported table.
///
/// Depending on tool and locale, spreadsheet exports arrive comma-,
/// semicolon-, tab- or pipe-separated. The real separator occurs on every
/// data line, so each candidate is scored by its occurrence count on the
/// worst sampled line (quoted stretches excluded); one row without it rules
/// a character out, no matter how common it is inside the data. Semicolon
/// is tried before comma so that European decimal commas lose ties.
fn sniff_delimiter(content: &str) -> u8 {
    const CANDIDATES: [u8; 4] = [b'\t', b';', b',', b'|'];

    let sample: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(8)
        .collect();

    let mut best = b',';
    let mut best_floor = 0;

    for candidate in CANDIDATES {
        let floor = sample
            .iter()
            .map(|line| count_unquoted(line, candidate))
            .min()
            .unwrap_or(0);
        if floor > best_floor {
            best_floor = floor;
            best = candidate;
        }
    }

    best
}

/// Occurrences of `delimiter` outside double-quoted stretches.
fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for &byte in line.as_bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if byte == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Read a delimited file into a string, tolerating legacy encodings.
///
/// Files straight out of Excel are frequently Windows-1252 rather than
/// UTF-8; when the bytes are not valid UTF-8 they are decoded as 1252
/// instead of failing the whole import.
fn read_text(path: &Path) -> Result<String, String> {
    let bytes =
        std::fs::read(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    match std::str::from_utf8(&bytes) {
        Ok(text) => Ok(text.to_string()),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
