use std::collections::{HashMap, HashSet};

use crate::config::FilterConfig;
use crate::error::MatrixError;
use crate::model::{DataSet, Sheet};

// ---------------------------------------------------------------------------
// Resolved scope
// ---------------------------------------------------------------------------

/// A filter config resolved against the loaded filter dataset, ready for
/// per-row evaluation. Value sets are normalized (trimmed, lower-cased)
/// exactly once here so both engine passes see identical verdicts.
#[derive(Debug, Clone)]
pub enum FilterScope {
    Disabled,
    GlobalSet {
        values: HashSet<String>,
        column: Option<String>,
    },
    PerSource {
        value_sets: HashMap<String, HashSet<String>>,
        source_columns: HashMap<String, String>,
        filter_columns: HashMap<String, String>,
    },
    Substring {
        values: Vec<String>,
    },
}

impl FilterScope {
    pub fn resolve(
        config: Option<&FilterConfig>,
        filter_data: Option<&DataSet>,
    ) -> Result<FilterScope, MatrixError> {
        let Some(config) = config else {
            return Ok(FilterScope::Disabled);
        };

        match config {
            FilterConfig::Disabled => Ok(FilterScope::Disabled),

            FilterConfig::Global {
                values,
                file,
                column,
            } => {
                let values = flat_values(values, file.as_deref(), filter_data)?;
                Ok(FilterScope::GlobalSet {
                    values: values.into_iter().collect(),
                    column: column.clone(),
                })
            }

            FilterConfig::Substring { values, file } => {
                let mut values = flat_values(values, file.as_deref(), filter_data)?;
                values.sort();
                values.dedup();
                Ok(FilterScope::Substring { values })
            }

            FilterConfig::PerSource {
                value_sets,
                file,
                source_columns,
                filter_columns,
            } => {
                let mut sets: HashMap<String, HashSet<String>> = value_sets
                    .iter()
                    .map(|(name, values)| {
                        let set = values
                            .iter()
                            .map(|v| normalize(v))
                            .filter(|v| !v.is_empty())
                            .collect();
                        (name.clone(), set)
                    })
                    .collect();

                // Each filter-file column contributes one named value set.
                if let Some(file) = file {
                    let sheet = filter_sheet(file, filter_data)?;
                    for header in &sheet.headers {
                        let set = sets.entry(header.clone()).or_default();
                        for row in &sheet.rows {
                            if let Some(value) = row.get(header) {
                                let value = normalize(value);
                                if !value.is_empty() {
                                    set.insert(value);
                                }
                            }
                        }
                    }
                }

                Ok(FilterScope::PerSource {
                    value_sets: sets,
                    source_columns: source_columns.clone(),
                    filter_columns: filter_columns.clone(),
                })
            }
        }
    }

    /// Decide whether one row participates in matrix construction. Called
    /// identically during key collection and grid population.
    pub fn includes(
        &self,
        row: &HashMap<String, String>,
        row_label: &str,
        source_key: &str,
    ) -> bool {
        match self {
            FilterScope::Disabled => true,

            FilterScope::GlobalSet { values, column } => {
                let derived = match column {
                    Some(column) => row.get(column).map(String::as_str).unwrap_or(""),
                    None => row_label,
                };
                values.contains(&normalize(derived))
            }

            FilterScope::PerSource {
                value_sets,
                source_columns,
                filter_columns,
            } => {
                // Unmapped sources pass unfiltered rather than being
                // silently dropped.
                let (Some(data_column), Some(set_name)) = (
                    source_columns.get(source_key),
                    filter_columns.get(source_key),
                ) else {
                    return true;
                };
                let Some(allowed) = value_sets.get(set_name) else {
                    return true;
                };
                let value = row.get(data_column).map(String::as_str).unwrap_or("");
                allowed.contains(&normalize(value))
            }

            FilterScope::Substring { values } => {
                let label = row_label.to_lowercase();
                values.iter().any(|value| label.contains(value.as_str()))
            }
        }
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Inline values plus, when a filter file is configured, the union of every
/// cell value on its first sheet.
fn flat_values(
    inline: &[String],
    file: Option<&str>,
    filter_data: Option<&DataSet>,
) -> Result<Vec<String>, MatrixError> {
    let mut values: Vec<String> = inline
        .iter()
        .map(|v| normalize(v))
        .filter(|v| !v.is_empty())
        .collect();

    if let Some(file) = file {
        let sheet = filter_sheet(file, filter_data)?;
        for row in &sheet.rows {
            for header in &sheet.headers {
                if let Some(value) = row.get(header) {
                    let value = normalize(value);
                    if !value.is_empty() {
                        values.push(value);
                    }
                }
            }
        }
    }

    Ok(values)
}

fn filter_sheet<'a>(
    file: &str,
    filter_data: Option<&'a DataSet>,
) -> Result<&'a Sheet, MatrixError> {
    let data = filter_data.ok_or_else(|| {
        MatrixError::Invalid(format!(
            "filter references file '{file}' but no filter data was loaded"
        ))
    })?;
    data.sheets.first().ok_or_else(|| {
        MatrixError::Invalid(format!("filter file '{file}' contains no sheets"))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileType;

    fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn filter_file(headers: &[&str], rows: &[&[&str]]) -> DataSet {
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        let rows = rows
            .iter()
            .map(|values| {
                headers
                    .iter()
                    .cloned()
                    .zip(values.iter().map(|v| v.to_string()))
                    .collect()
            })
            .collect();
        DataSet {
            file_name: "allowed.csv".into(),
            file_type: FileType::Csv,
            sheets: vec![Sheet {
                name: "Sheet1".into(),
                headers,
                rows,
            }],
        }
    }

    #[test]
    fn disabled_includes_everything() {
        let scope = FilterScope::resolve(None, None).unwrap();
        assert!(scope.includes(&row(&[]), "", "0-Sheet1"));
    }

    #[test]
    fn global_matches_row_label_case_insensitively() {
        let config = FilterConfig::Global {
            values: vec!["Alice | Ops".into()],
            file: None,
            column: None,
        };
        let scope = FilterScope::resolve(Some(&config), None).unwrap();
        assert!(scope.includes(&row(&[]), "alice | ops", "0-S"));
        assert!(scope.includes(&row(&[]), "  ALICE | OPS ", "0-S"));
        assert!(!scope.includes(&row(&[]), "bob", "0-S"));
    }

    #[test]
    fn global_with_designated_column() {
        let config = FilterConfig::Global {
            values: vec!["eng".into()],
            file: None,
            column: Some("dept".into()),
        };
        let scope = FilterScope::resolve(Some(&config), None).unwrap();
        assert!(scope.includes(&row(&[("dept", "Eng")]), "whatever", "0-S"));
        assert!(!scope.includes(&row(&[("dept", "sales")]), "eng", "0-S"));
    }

    #[test]
    fn global_values_from_filter_file() {
        let config = FilterConfig::Global {
            values: vec![],
            file: Some("allowed.csv".into()),
            column: None,
        };
        let data = filter_file(&["Allowed"], &[&["Alice"], &["Bob"], &[""]]);
        let scope = FilterScope::resolve(Some(&config), Some(&data)).unwrap();
        assert!(scope.includes(&row(&[]), "alice", "0-S"));
        assert!(scope.includes(&row(&[]), "BOB", "0-S"));
        assert!(!scope.includes(&row(&[]), "", "0-S"));
        assert!(!scope.includes(&row(&[]), "carol", "0-S"));
    }

    #[test]
    fn missing_filter_file_is_a_config_error() {
        let config = FilterConfig::Global {
            values: vec![],
            file: Some("allowed.csv".into()),
            column: None,
        };
        let err = FilterScope::resolve(Some(&config), None).unwrap_err();
        assert!(err.to_string().contains("allowed.csv"));
    }

    #[test]
    fn per_source_mapped_membership() {
        let config = FilterConfig::PerSource {
            value_sets: HashMap::from([("Departments".to_string(), vec!["eng".to_string()])]),
            file: None,
            source_columns: HashMap::from([("0-Sheet1".to_string(), "dept".to_string())]),
            filter_columns: HashMap::from([("0-Sheet1".to_string(), "Departments".to_string())]),
        };
        let scope = FilterScope::resolve(Some(&config), None).unwrap();

        // Case-different value is still a member.
        assert!(scope.includes(&row(&[("dept", "Eng")]), "r", "0-Sheet1"));
        assert!(!scope.includes(&row(&[("dept", "sales")]), "r", "0-Sheet1"));
        // A source with no mapping entry is never excluded.
        assert!(scope.includes(&row(&[("dept", "sales")]), "r", "1-Sheet1"));
    }

    #[test]
    fn per_source_sets_from_filter_file_columns() {
        let config = FilterConfig::PerSource {
            value_sets: HashMap::new(),
            file: Some("allowed.xlsx".into()),
            source_columns: HashMap::from([("0-A".to_string(), "dept".to_string())]),
            filter_columns: HashMap::from([("0-A".to_string(), "Depts".to_string())]),
        };
        let data = filter_file(&["Depts", "Sites"], &[&["Eng", "Berlin"], &["Ops", ""]]);
        let scope = FilterScope::resolve(Some(&config), Some(&data)).unwrap();

        assert!(scope.includes(&row(&[("dept", "eng")]), "r", "0-A"));
        assert!(scope.includes(&row(&[("dept", "OPS")]), "r", "0-A"));
        // Values from the other filter column belong to a different set.
        assert!(!scope.includes(&row(&[("dept", "Berlin")]), "r", "0-A"));
    }

    #[test]
    fn per_source_unknown_set_passes_through() {
        let config = FilterConfig::PerSource {
            value_sets: HashMap::from([("Departments".to_string(), vec!["eng".to_string()])]),
            file: None,
            source_columns: HashMap::from([("0-A".to_string(), "dept".to_string())]),
            filter_columns: HashMap::from([("0-A".to_string(), "NoSuchSet".to_string())]),
        };
        let scope = FilterScope::resolve(Some(&config), None).unwrap();
        assert!(scope.includes(&row(&[("dept", "anything")]), "r", "0-A"));
    }

    #[test]
    fn substring_matches_within_label() {
        let config = FilterConfig::Substring {
            values: vec!["Ops".into(), "qa".into()],
            file: None,
        };
        let scope = FilterScope::resolve(Some(&config), None).unwrap();
        assert!(scope.includes(&row(&[]), "alice | OPS", "0-S"));
        assert!(scope.includes(&row(&[]), "team-QA-west", "0-S"));
        assert!(!scope.includes(&row(&[]), "alice | eng", "0-S"));
    }
}
