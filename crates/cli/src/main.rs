// MatProc CLI - config-driven intersection matrices from spreadsheet data

mod exit_codes;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_INVALID_CONFIG, EXIT_NO_MATRICES, EXIT_RUNTIME, EXIT_SUCCESS};
use matproc_matrix::{ComputeConfig, Session};

#[derive(Parser)]
#[command(name = "matproc")]
#[command(about = "Intersection matrices from spreadsheet data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute matrices from a TOML config file
    #[command(after_help = "\
Examples:
  matproc run review.toml
  matproc run review.toml --json
  matproc run review.toml --output result.json --export matrices.xlsx")]
    Run {
        /// Path to the config file
        config: PathBuf,

        /// Output JSON to stdout instead of the human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the matrices to an Excel workbook
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Validate a config without loading data or computing
    #[command(after_help = "\
Examples:
  matproc validate review.toml")]
    Validate {
        /// Path to the config file
        config: PathBuf,
    },

    /// List the sheets, headers and row counts of an input file
    #[command(after_help = "\
Examples:
  matproc inspect systems.xlsx
  matproc inspect hr.csv --json")]
    Inspect {
        /// Path to a CSV or Excel file
        file: PathBuf,

        /// Output JSON instead of the human listing
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            json,
            output,
            export,
        } => cmd_run(config, json, output, export),
        Commands::Validate { config } => cmd_validate(config),
        Commands::Inspect { file, json } => cmd_inspect(file, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError {
            code,
            message,
            hint,
        }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    fn config(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_INVALID_CONFIG,
            message: msg.into(),
            hint: None,
        }
    }

    fn runtime(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_RUNTIME,
            message: msg.into(),
            hint: None,
        }
    }
}

// ============================================================================
// run
// ============================================================================

fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    export_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let config_str = std::fs::read_to_string(&config_path)
        .map_err(|e| CliError::runtime(format!("cannot read config: {e}")))?;
    let config = ComputeConfig::from_toml(&config_str).map_err(|e| CliError::config(e.to_string()))?;

    // Input paths resolve relative to the config file's directory
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let mut session = Session::new();
    for entry in &config.files {
        let path = base_dir.join(&entry.path);
        let dataset = matproc_io::load(&path)
            .map_err(|e| CliError::runtime(format!("cannot load {}: {e}", path.display())))?;
        session.load(dataset);
    }

    if let Some(filter_file) = config.filter.as_ref().and_then(|f| f.file()) {
        let path = base_dir.join(filter_file);
        let dataset = matproc_io::load(&path).map_err(|e| {
            CliError::runtime(format!("cannot load filter file {}: {e}", path.display()))
        })?;
        session.set_filter_data(dataset);
    }

    let result = matproc_matrix::run(&config, session.input())
        .map_err(|e| CliError::config(e.to_string()))?;

    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| CliError::runtime(format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::runtime(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if let Some(ref path) = export_file {
        let stats = matproc_io::xlsx::export(&result, path).map_err(CliError::runtime)?;
        eprintln!("wrote {} ({} sheets)", path.display(), stats.sheets_exported);
    }

    if json_output {
        println!("{json_str}");
    }

    // Human summary to stderr
    let s = &result.summary;
    eprintln!(
        "'{}': {} matrices, {} intersections ({} groups skipped, {} sources skipped)",
        result.meta.config_name, s.matrices, s.cells_set, s.groups_skipped, s.sources_skipped,
    );
    for matrix in &result.matrices {
        eprintln!(
            "  {}: {} x {}",
            matrix.name,
            matrix.row_labels.len(),
            matrix.col_labels.len(),
        );
    }

    if result.matrices.is_empty() {
        return Err(CliError {
            code: EXIT_NO_MATRICES,
            message: "no matrices produced".into(),
            hint: Some("check source keys and column selections with `matproc inspect`".into()),
        });
    }

    Ok(())
}

// ============================================================================
// validate
// ============================================================================

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config_str = std::fs::read_to_string(&config_path)
        .map_err(|e| CliError::runtime(format!("cannot read config: {e}")))?;

    match ComputeConfig::from_toml(&config_str) {
        Ok(config) => {
            eprintln!(
                "valid: '{}' with {} file(s), {} selection(s), {} matrix group(s)",
                config.name,
                config.files.len(),
                config.selections.len(),
                config.matrices.len(),
            );
            Ok(())
        }
        Err(e) => Err(CliError::config(e.to_string())),
    }
}

// ============================================================================
// inspect
// ============================================================================

fn cmd_inspect(file: PathBuf, json: bool) -> Result<(), CliError> {
    let dataset = matproc_io::load(&file)
        .map_err(|e| CliError::runtime(format!("cannot load {}: {e}", file.display())))?;

    if json {
        let out = serde_json::to_string_pretty(&dataset)
            .map_err(|e| CliError::runtime(format!("JSON serialization error: {e}")))?;
        println!("{out}");
        return Ok(());
    }

    println!("{} ({})", dataset.file_name, dataset.file_type);
    for sheet in &dataset.sheets {
        println!("  {}: {} rows", sheet.name, sheet.rows.len());
        if !sheet.headers.is_empty() {
            println!("    columns: {}", sheet.headers.join(", "));
        }
    }
    Ok(())
}
