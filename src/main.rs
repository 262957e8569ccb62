use clap::{Parser, Subcommand};
use osheet2xlsx::cli::{self, ConvertOptions, OutputMode};
use osheet2xlsx::config;
use osheet2xlsx::error::OsheetError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "osheet2xlsx")]
#[command(about = "Convert .osheet spreadsheet containers to .xlsx")]
#[command(long_about = "osheet2xlsx - schema-tolerant .osheet to .xlsx converter

Detects the container format automatically (ZIP or binary), parses the
document under multiple historical schema variants, infers cell types
(numbers with locale separators, dates, epoch timestamps, booleans), and
writes an Excel workbook.

EXAMPLES:
  osheet2xlsx convert report.osheet                 # single file
  osheet2xlsx convert ./in --recursive --out-dir out
  osheet2xlsx validate report.osheet                # pre-flight check
  osheet2xlsx inspect report.osheet                 # sheet names

EXIT CODES:
  0 success | 2 usage / no inputs | 3 I/O | 4 structure invalid | 5 partial failure")]
#[command(version)]
struct Cli {
    /// Log level: error|warn|info|debug (also RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Suppress non-error output
    #[arg(long, global = true)]
    quiet: bool,

    /// Emit machine-readable JSON events
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert .osheet files to .xlsx
    Convert {
        /// Input file, or directory to scan (defaults to the current directory)
        path: Option<PathBuf>,

        /// Output .xlsx file path (single input only)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Output directory (batch)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Scan directories recursively
        #[arg(long)]
        recursive: bool,

        /// Glob pattern for inputs
        #[arg(long)]
        pattern: Option<String>,

        /// Overwrite existing output files
        #[arg(long)]
        overwrite: bool,

        /// Do not write files, only report
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Stop batch on first error
        #[arg(long)]
        fail_fast: bool,
    },

    /// Inspect .osheet metadata
    Inspect {
        /// Path to the .osheet file
        path: PathBuf,
    },

    /// Validate .osheet structure
    Validate {
        /// Path to the .osheet file
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let cfg = config::load();

    // Flags override config
    let quiet = cli.quiet || cfg.quiet;
    let json = cli.json || cfg.json;
    let level = cli
        .log_level
        .clone()
        .or_else(|| (!cfg.log_level.is_empty()).then(|| cfg.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let mode = OutputMode { json, quiet };

    let result = match cli.command {
        Commands::Convert {
            path,
            out,
            out_dir,
            recursive,
            pattern,
            overwrite,
            dry_run,
            fail_fast,
        } => {
            // Config supplies defaults for unset flags
            let opts = ConvertOptions {
                input: path,
                out,
                out_dir: out_dir.or_else(|| {
                    (!cfg.convert.out_dir.is_empty())
                        .then(|| PathBuf::from(&cfg.convert.out_dir))
                }),
                recursive: recursive || cfg.convert.recursive,
                pattern: pattern
                    .or_else(|| {
                        (!cfg.convert.pattern.is_empty()).then(|| cfg.convert.pattern.clone())
                    })
                    .unwrap_or_else(|| "*.osheet".to_string()),
                overwrite: overwrite || cfg.convert.overwrite,
                dry_run: dry_run || cfg.convert.dry_run,
                fail_fast: fail_fast || cfg.convert.fail_fast,
            };
            cli::convert(&opts, &mode)
        }
        Commands::Inspect { path } => cli::inspect(&path, &mode),
        Commands::Validate { path } => cli::validate(&path, &mode),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Stable exit-code mapping for callers scripting around the binary.
fn exit_code(err: &OsheetError) -> u8 {
    match err {
        OsheetError::NoInputs => 2,
        OsheetError::Io(_)
        | OsheetError::Zip(_)
        | OsheetError::Xlsx(_)
        | OsheetError::OutputExists(_) => 3,
        OsheetError::Validation { .. }
        | OsheetError::NotOsheet(_)
        | OsheetError::UnknownFormat(_)
        | OsheetError::Json(_)
        | OsheetError::NoRootJson
        | OsheetError::NoSheetsObject
        | OsheetError::NoSheetDataSection
        | OsheetError::NoCellsData
        | OsheetError::UnbalancedJson => 4,
        OsheetError::PartialFailure { .. } => 5,
    }
}
