use std::collections::{BTreeSet, HashMap};

use crate::config::{ComputeConfig, EmptyGroupPolicy, GroupConfig, SourceEntry};
use crate::error::MatrixError;
use crate::filter::FilterScope;
use crate::key::row_label;
use crate::model::{
    ComputeInput, DataSet, Matrix, MatrixSet, RunMeta, RunSummary, Sheet, SourceRef,
};

/// Run the computation per config. Returns named matrices in config order.
pub fn run(config: &ComputeConfig, input: &ComputeInput) -> Result<MatrixSet, MatrixError> {
    let scope = FilterScope::resolve(config.filter.as_ref(), input.filter_data.as_ref())?;
    let policy = config.output.empty_groups;

    let mut matrices = Vec::new();
    let mut summary = RunSummary::default();

    for group in &config.matrices {
        let (sources, skipped) = resolve_sources(group, config, &input.datasets);
        summary.sources_skipped += skipped;

        if sources.is_empty() {
            summary.groups_skipped += 1;
            continue;
        }

        let built = if group.merge {
            build_matrices(&group.name, &sources, &scope, policy)
        } else {
            let mut per_source = Vec::new();
            for source in &sources {
                let name = format!("{} - {}", source.base_name, source.sheet_name);
                per_source.extend(build_matrices(
                    &name,
                    std::slice::from_ref(source),
                    &scope,
                    policy,
                ));
            }
            per_source
        };

        if built.is_empty() {
            summary.groups_skipped += 1;
        }
        for matrix in &built {
            summary.cells_set += matrix
                .grid
                .iter()
                .map(|row| row.iter().filter(|&&cell| cell == 1).count())
                .sum::<usize>();
        }
        matrices.extend(built);
    }

    summary.matrices = matrices.len();

    Ok(MatrixSet {
        meta: RunMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        matrices,
    })
}

// ---------------------------------------------------------------------------
// Source resolution
// ---------------------------------------------------------------------------

/// A group source with its sheet and effective column selection resolved.
struct ResolvedSource<'a> {
    source_key: String,
    base_name: &'a str,
    sheet_name: &'a str,
    sheet: &'a Sheet,
    row_columns: Vec<String>,
    col_column: String,
    secondary_column: Option<String>,
}

/// Expand group sources to `(file_index, sheet_name)` form and resolve each
/// against the loaded datasets. Sources that cannot be resolved (malformed
/// compact keys, out-of-range file indices, unknown sheets, incomplete
/// column selections) are skipped, never errors.
fn resolve_sources<'a>(
    group: &GroupConfig,
    config: &ComputeConfig,
    datasets: &'a [DataSet],
) -> (Vec<ResolvedSource<'a>>, usize) {
    let mut resolved = Vec::new();
    let mut skipped = 0;

    for entry in &group.sources {
        let (source_ref, row_override, col_override, secondary_override) = match entry {
            SourceEntry::Key(key) => match SourceRef::parse_key(key) {
                Some(source_ref) => (source_ref, None, None, None),
                None => {
                    skipped += 1;
                    continue;
                }
            },
            SourceEntry::Spec(spec) => (
                SourceRef {
                    file_index: spec.file,
                    sheet_name: spec.sheet.clone(),
                },
                spec.row_columns.clone(),
                spec.col_column.clone(),
                spec.secondary_column.clone(),
            ),
        };

        let Some(dataset) = datasets.get(source_ref.file_index) else {
            skipped += 1;
            continue;
        };
        let Some(sheet) = dataset.sheet(&source_ref.sheet_name) else {
            skipped += 1;
            continue;
        };

        let source_key = source_ref.key();
        let selection = config.selections.get(&source_key);

        // Inline settings on the source entry override the keyed selection.
        let row_columns = row_override
            .or_else(|| selection.map(|s| s.row_columns.clone()))
            .unwrap_or_default();
        let col_column = col_override.or_else(|| selection.and_then(|s| s.col_column.clone()));
        let secondary_column =
            secondary_override.or_else(|| selection.and_then(|s| s.secondary_column.clone()));

        if row_columns.is_empty() {
            skipped += 1;
            continue;
        }
        let Some(col_column) = col_column else {
            skipped += 1;
            continue;
        };

        resolved.push(ResolvedSource {
            source_key,
            base_name: dataset.base_name(),
            sheet_name: &sheet.name,
            sheet,
            row_columns,
            col_column,
            secondary_column,
        });
    }

    (resolved, skipped)
}

// ---------------------------------------------------------------------------
// Matrix construction
// ---------------------------------------------------------------------------

/// Build the matrices for one label universe: the whole group when merging,
/// a single source otherwise. With a secondary axis this yields one matrix
/// per distinct secondary value over the shared labels; otherwise at most one.
fn build_matrices(
    name: &str,
    sources: &[ResolvedSource<'_>],
    scope: &FilterScope,
    policy: EmptyGroupPolicy,
) -> Vec<Matrix> {
    let has_secondary = sources.iter().any(|s| s.secondary_column.is_some());

    // Collection pass: unique row keys (filtered), column keys (never
    // filtered), and secondary values. BTreeSet keeps them sorted.
    let mut row_keys: BTreeSet<String> = BTreeSet::new();
    let mut col_keys: BTreeSet<String> = BTreeSet::new();
    let mut secondary_values: BTreeSet<String> = BTreeSet::new();

    for source in sources {
        for row in &source.sheet.rows {
            let label = row_label(row, &source.row_columns);
            let col = cell(row, &source.col_column);

            if !label.is_empty() && scope.includes(row, &label, &source.source_key) {
                row_keys.insert(label);
            }
            if !col.is_empty() {
                col_keys.insert(col.to_string());
            }
            if let Some(ref secondary_column) = source.secondary_column {
                let value = cell(row, secondary_column);
                if !value.is_empty() {
                    secondary_values.insert(value.to_string());
                }
            }
        }
    }

    if row_keys.is_empty() || col_keys.is_empty() {
        return match policy {
            EmptyGroupPolicy::Omit => Vec::new(),
            EmptyGroupPolicy::Emit => {
                let rows = row_keys.len();
                let cols = col_keys.len();
                vec![Matrix {
                    name: name.to_string(),
                    row_labels: row_keys.into_iter().collect(),
                    col_labels: col_keys.into_iter().collect(),
                    grid: vec![vec![0u8; cols]; rows],
                }]
            }
        };
    }

    let row_labels: Vec<String> = row_keys.into_iter().collect();
    let col_labels: Vec<String> = col_keys.into_iter().collect();

    if has_secondary && !secondary_values.is_empty() {
        secondary_values
            .iter()
            .map(|value| Matrix {
                name: format!("{name} - {value}"),
                grid: populate(sources, scope, &row_labels, &col_labels, Some(value)),
                row_labels: row_labels.clone(),
                col_labels: col_labels.clone(),
            })
            .collect()
    } else {
        vec![Matrix {
            name: name.to_string(),
            grid: populate(sources, scope, &row_labels, &col_labels, None),
            row_labels,
            col_labels,
        }]
    }
}

/// Population pass: re-derive labels, re-apply the filter identically, and
/// mark intersections through label → index maps built once per pass.
fn populate(
    sources: &[ResolvedSource<'_>],
    scope: &FilterScope,
    row_labels: &[String],
    col_labels: &[String],
    secondary: Option<&str>,
) -> Vec<Vec<u8>> {
    let row_index: HashMap<&str, usize> = row_labels
        .iter()
        .enumerate()
        .map(|(i, label)| (label.as_str(), i))
        .collect();
    let col_index: HashMap<&str, usize> = col_labels
        .iter()
        .enumerate()
        .map(|(i, label)| (label.as_str(), i))
        .collect();

    let mut grid = vec![vec![0u8; col_index.len()]; row_index.len()];

    for source in sources {
        for row in &source.sheet.rows {
            if let Some(slice) = secondary {
                // Rows populate only the slice their secondary value names;
                // sources without a secondary column populate none of them.
                let matches = source
                    .secondary_column
                    .as_ref()
                    .map(|column| cell(row, column) == slice)
                    .unwrap_or(false);
                if !matches {
                    continue;
                }
            }

            let label = row_label(row, &source.row_columns);
            let col = cell(row, &source.col_column);
            if label.is_empty() || col.is_empty() {
                continue;
            }
            if !scope.includes(row, &label, &source.source_key) {
                continue;
            }
            if let (Some(&r), Some(&c)) = (row_index.get(label.as_str()), col_index.get(col)) {
                grid[r][c] = 1;
            }
        }
    }

    grid
}

/// A single trimmed cell value; missing columns read as empty.
fn cell<'a>(row: &'a HashMap<String, String>, column: &str) -> &'a str {
    row.get(column).map(String::as_str).unwrap_or("").trim()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
