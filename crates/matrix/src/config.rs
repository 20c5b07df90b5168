use std::collections::HashMap;

use serde::Deserialize;

use crate::error::MatrixError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ComputeConfig {
    pub name: String,
    pub files: Vec<FileEntry>,
    #[serde(default)]
    pub selections: HashMap<String, ColumnSelection>,
    pub matrices: Vec<GroupConfig>,
    #[serde(default)]
    pub filter: Option<FilterConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileEntry {
    pub path: String,
}

// ---------------------------------------------------------------------------
// Column selection
// ---------------------------------------------------------------------------

/// Which columns of a source supply the row and column labels, keyed by
/// source key. A selection with no row columns or no column column makes
/// its source contribute nothing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColumnSelection {
    #[serde(default)]
    pub row_columns: Vec<String>,
    #[serde(default)]
    pub col_column: Option<String>,
    #[serde(default)]
    pub secondary_column: Option<String>,
}

// ---------------------------------------------------------------------------
// Matrix groups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    /// `true` builds one matrix over all sources' combined keys;
    /// `false` builds one matrix per source.
    #[serde(default)]
    pub merge: bool,
    pub sources: Vec<SourceEntry>,
}

/// A group source: either a compact source key (`"0-Sheet1"`) or an explicit
/// table that may override the keyed column selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SourceEntry {
    Key(String),
    Spec(SourceSpec),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceSpec {
    pub file: usize,
    pub sheet: String,
    #[serde(default)]
    pub row_columns: Option<Vec<String>>,
    #[serde(default)]
    pub col_column: Option<String>,
    #[serde(default)]
    pub secondary_column: Option<String>,
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Filter configuration. The active scope is a tagged variant so the engine
/// never has to infer it from which optional keys happen to be populated.
///
/// Values may be given inline, resolved from a filter file (loaded by the
/// caller, never by the engine), or both.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FilterConfig {
    Disabled,
    /// Row label (or a designated comparison column) must be an exact,
    /// case-insensitive member of the value set.
    Global {
        #[serde(default)]
        values: Vec<String>,
        #[serde(default)]
        file: Option<String>,
        #[serde(default)]
        column: Option<String>,
    },
    /// Each source key maps to a data column and to a named value set;
    /// sources with no mapping pass unfiltered.
    PerSource {
        #[serde(default)]
        value_sets: HashMap<String, Vec<String>>,
        #[serde(default)]
        file: Option<String>,
        #[serde(default)]
        source_columns: HashMap<String, String>,
        #[serde(default)]
        filter_columns: HashMap<String, String>,
    },
    /// A row passes when any value is a case-insensitive substring of its
    /// row label.
    Substring {
        #[serde(default)]
        values: Vec<String>,
        #[serde(default)]
        file: Option<String>,
    },
}

impl FilterConfig {
    /// Filter file referenced by this config, if any. The caller loads it;
    /// the engine only ever sees parsed data.
    pub fn file(&self) -> Option<&str> {
        match self {
            FilterConfig::Disabled => None,
            FilterConfig::Global { file, .. }
            | FilterConfig::PerSource { file, .. }
            | FilterConfig::Substring { file, .. } => file.as_deref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyGroupPolicy {
    /// A group with no row keys or no column keys yields no matrix.
    Omit,
    /// Degenerate groups still emit a matrix with one or both axes empty.
    Emit,
}

impl Default for EmptyGroupPolicy {
    fn default() -> Self {
        Self::Omit
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub empty_groups: EmptyGroupPolicy,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ComputeConfig {
    pub fn from_toml(input: &str) -> Result<Self, MatrixError> {
        let config: ComputeConfig =
            toml::from_str(input).map_err(|e| MatrixError::Syntax(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MatrixError> {
        if self.name.trim().is_empty() {
            return Err(MatrixError::Invalid(
                "name must not be blank".into(),
            ));
        }

        if self.files.is_empty() {
            return Err(MatrixError::Invalid(
                "at least one input file is required".into(),
            ));
        }

        if self.matrices.is_empty() {
            return Err(MatrixError::Invalid(
                "at least one matrix group is required".into(),
            ));
        }

        for group in &self.matrices {
            if group.name.trim().is_empty() {
                return Err(MatrixError::Invalid(
                    "matrix group names must not be blank".into(),
                ));
            }
        }

        // Each mode must have somewhere to take its values from.
        match &self.filter {
            None | Some(FilterConfig::Disabled) => {}
            Some(FilterConfig::Global { values, file, .. })
            | Some(FilterConfig::Substring { values, file }) => {
                if values.is_empty() && file.is_none() {
                    return Err(MatrixError::Invalid(
                        "filter requires inline values or a filter file".into(),
                    ));
                }
            }
            Some(FilterConfig::PerSource {
                value_sets, file, ..
            }) => {
                if value_sets.is_empty() && file.is_none() {
                    return Err(MatrixError::Invalid(
                        "per-source filter requires value sets or a filter file".into(),
                    ));
                }
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
