//! Pre-flight structural validation of ZIP-based .osheet containers.
//!
//! Runs the same parsing attempts as the reader but reports machine-readable
//! diagnostics instead of producing a model. The checks are mutually
//! exclusive and ordered, so a call yields at most one issue; an empty list
//! means "structurally acceptable", not "error-free".

use crate::reader;
use crate::types::{issue_codes, ValidationIssue};
use std::path::Path;

/// Inspect a container and report structural issues.
///
/// Unlike the reader, this never fails on malformed input and it attempts
/// *every* `sheets/*.json` entry rather than stopping at the first success.
pub fn validate_structure(path: &Path) -> Vec<ValidationIssue> {
    let entries = match reader::read_entries(path) {
        Ok(entries) if !entries.is_empty() => entries,
        _ => {
            return vec![ValidationIssue {
                code: issue_codes::NOT_ZIP,
                message: "cannot open as zip".to_string(),
            }]
        }
    };

    // Manifest present and parseable?
    if reader::try_parse_document_json(&entries).is_some() {
        return Vec::new();
    }
    let has_doc = entries
        .iter()
        .any(|e| !e.is_dir && basename(&e.name).eq_ignore_ascii_case("document.json"));
    if has_doc {
        return vec![ValidationIssue {
            code: issue_codes::DOC_JSON_INVALID,
            message: "document.json present but invalid or empty".to_string(),
        }];
    }

    // Any sheets/*.json entry parseable?
    let mut any_sheet_json = false;
    for entry in &entries {
        if entry.is_dir
            || !entry.name.starts_with("sheets/")
            || !entry.name.to_lowercase().ends_with(".json")
        {
            continue;
        }
        any_sheet_json = true;
        if reader::try_parse_sheet_json(basename(&entry.name), &entry.data).is_some() {
            return Vec::new();
        }
    }
    if any_sheet_json {
        return vec![ValidationIssue {
            code: issue_codes::SHEETS_JSON_INVALID,
            message: "sheets/*.json present but not parseable".to_string(),
        }];
    }

    // The text-embed fallback path is still acceptable
    if entries
        .iter()
        .any(|e| !e.is_dir && e.name.starts_with("sheets/"))
    {
        return Vec::new();
    }

    vec![ValidationIssue {
        code: issue_codes::NO_SHEETS,
        message: "no sheets or document.json found".to_string(),
    }]
}

fn basename(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}
