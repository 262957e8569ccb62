//! Batch input discovery.

use crate::error::OsheetResult;
use regex::Regex;
use std::path::{Path, PathBuf};

/// List files under `root` whose names match the glob `pattern`.
///
/// Non-recursive mode matches only direct children. Results are sorted so
/// batch runs process inputs in a stable order.
pub fn list_inputs(root: &Path, pattern: &str, recursive: bool) -> OsheetResult<Vec<PathBuf>> {
    let matcher = glob_to_regex(pattern)?;
    let mut results = Vec::new();
    walk(root, &matcher, recursive, &mut results)?;
    results.sort();
    Ok(results)
}

fn walk(
    dir: &Path,
    matcher: &Regex,
    recursive: bool,
    results: &mut Vec<PathBuf>,
) -> OsheetResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            if recursive {
                walk(&path, matcher, recursive, results)?;
            }
            continue;
        }
        let name = entry.file_name();
        if matcher.is_match(&name.to_string_lossy()) {
            results.push(path);
        }
    }
    Ok(())
}

/// Translate a shell glob (`*`, `?`) into an anchored regex over file names.
fn glob_to_regex(pattern: &str) -> OsheetResult<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()).into()
    })
}
