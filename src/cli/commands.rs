use crate::convert::{convert_single, derive_output_name};
use crate::error::{OsheetError, OsheetResult};
use crate::reader;
use crate::scan;
use crate::validate::validate_structure;
use colored::Colorize;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

/// How command output is rendered.
pub struct OutputMode {
    /// Emit machine-readable JSON events instead of human text
    pub json: bool,
    /// Suppress non-error output
    pub quiet: bool,
}

impl OutputMode {
    fn emit(&self, human: impl FnOnce() -> String, event: impl FnOnce() -> serde_json::Value) {
        if self.quiet {
            return;
        }
        if self.json {
            println!("{}", event());
        } else {
            println!("{}", human());
        }
    }
}

/// Options for the convert command after config hydration.
pub struct ConvertOptions {
    pub input: Option<PathBuf>,
    pub out: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub recursive: bool,
    pub pattern: String,
    pub overwrite: bool,
    pub dry_run: bool,
    pub fail_fast: bool,
}

/// Execute the convert command: a single file, or a batch scan of a
/// directory. Batch failures are collected and reported as a partial
/// failure; `fail_fast` stops at the first one.
pub fn convert(opts: &ConvertOptions, mode: &OutputMode) -> OsheetResult<()> {
    let inputs = resolve_inputs(opts)?;
    if inputs.is_empty() {
        return Err(OsheetError::NoInputs);
    }

    info!(
        inputs = inputs.len(),
        pattern = %opts.pattern,
        recursive = opts.recursive,
        dry_run = opts.dry_run,
        "convert"
    );

    let total = inputs.len();
    let mut failed = 0usize;
    let mut last_err = None;
    for input in &inputs {
        let out_path = output_path_for(input, opts, total);

        if opts.dry_run {
            let shown = out_path
                .clone()
                .unwrap_or_else(|| derive_output_name(input));
            mode.emit(
                || {
                    format!(
                        "{} would convert {} -> {}",
                        "DRY-RUN:".yellow(),
                        input.display(),
                        shown.display()
                    )
                },
                || json!({"event": "convert_dry_run", "input": input, "output": &shown}),
            );
            continue;
        }

        match convert_single(input, out_path.as_deref(), opts.overwrite) {
            Ok(produced) => mode.emit(
                || {
                    format!(
                        "{} {} -> {}",
                        "OK:".green(),
                        input.display(),
                        produced.display()
                    )
                },
                || json!({"event": "convert_ok", "input": input, "output": &produced}),
            ),
            Err(e) => {
                failed += 1;
                if mode.json && !mode.quiet {
                    println!(
                        "{}",
                        json!({"event": "convert_error", "input": input, "error": e.to_string()})
                    );
                } else if total > 1 {
                    eprintln!("{} convert failed for {}: {}", "ERROR:".red(), input.display(), e);
                }
                last_err = Some(e);
                if opts.fail_fast {
                    break;
                }
            }
        }
    }

    match last_err {
        // A lone input reports its own error so the exit code stays specific
        Some(e) if total == 1 => Err(e),
        Some(_) => Err(OsheetError::PartialFailure { failed, total }),
        None => Ok(()),
    }
}

fn resolve_inputs(opts: &ConvertOptions) -> OsheetResult<Vec<PathBuf>> {
    if let Some(path) = &opts.input {
        if path.is_file() {
            return Ok(vec![path.clone()]);
        }
    }
    let root = opts
        .input
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    scan::list_inputs(&root, &opts.pattern, opts.recursive)
}

/// Explicit `--out` applies to single inputs only; `--out-dir` redirects the
/// derived file name; otherwise the output lands next to the input.
fn output_path_for(input: &Path, opts: &ConvertOptions, total: usize) -> Option<PathBuf> {
    if total == 1 {
        if let Some(out) = &opts.out {
            return Some(out.clone());
        }
    }
    opts.out_dir.as_ref().map(|dir| {
        match derive_output_name(input).file_name() {
            Some(name) => dir.join(name),
            None => dir.join("output.xlsx"),
        }
    })
}

/// Execute the inspect command: print sheet names from a real parse, or fall
/// back to counting container entries.
pub fn inspect(path: &Path, mode: &OutputMode) -> OsheetResult<()> {
    info!(path = %path.display(), "inspect");

    if let Ok(book) = reader::read_book_universal(path) {
        if !book.sheets.is_empty() {
            let names: Vec<&str> = book.sheets.iter().map(|s| s.name.as_str()).collect();
            mode.emit(
                || {
                    let mut out = format!("sheets: {}\n", names.len());
                    for name in &names {
                        out.push_str(&format!("- {name}\n"));
                    }
                    out.trim_end().to_string()
                },
                || json!({"event": "inspect", "sheets": names.len(), "names": &names}),
            );
            return Ok(());
        }
    }

    // Fallback: count raw container entries
    let entries = reader::read_entries(path)?;
    mode.emit(
        || format!("osheet: entries={}", entries.len()),
        || json!({"event": "inspect", "entries": entries.len()}),
    );
    Ok(())
}

/// Execute the validate command. Structural problems map to an error so the
/// caller can surface a distinct exit code.
pub fn validate(path: &Path, mode: &OutputMode) -> OsheetResult<()> {
    info!(path = %path.display(), "validate");

    let issues = validate_structure(path);
    match issues.first() {
        None => {
            mode.emit(
                || format!("{} structure looks valid", "OK:".green()),
                || json!({"event": "validate", "ok": true}),
            );
            Ok(())
        }
        Some(issue) => {
            mode.emit(
                || {
                    format!(
                        "{} {}: {}",
                        "INVALID:".red(),
                        issue.code,
                        issue.message
                    )
                },
                || json!({"event": "validate", "ok": false, "code": issue.code, "issue": &issue.message}),
            );
            Err(OsheetError::Validation {
                code: issue.code,
                message: issue.message.clone(),
            })
        }
    }
}
