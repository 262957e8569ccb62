//! Container format detection.
//!
//! Classifies an .osheet file as a ZIP container, a binary blob with embedded
//! JSON payloads, or unknown. Detection is a textual/structural sniff, not a
//! strongly-typed check: false positives on crafted input are accepted.

use crate::error::OsheetResult;
use crate::types::Format;
use regex::Regex;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// ZIP local-file-header magic: PK\x03\x04.
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Detect the container format of an .osheet file.
///
/// Never fails on a well-formed-but-foreign file; such inputs come back as
/// [`Format::Unknown`]. Only the initial open/read can error.
pub fn detect_format(path: &Path) -> OsheetResult<Format> {
    let mut file = File::open(path)?;

    let mut header = [0u8; 4];
    let n = file.read(&mut header)?;
    if n == 4 && header == ZIP_MAGIC && is_valid_zip(path) {
        return Ok(Format::Zip);
    }

    let data = std::fs::read(path)?;
    if is_binary_osheet(&data) {
        return Ok(Format::Binary);
    }

    Ok(Format::Unknown)
}

/// Confirm the central directory parses and holds at least one entry.
fn is_valid_zip(path: &Path) -> bool {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return false,
    };
    match zip::ZipArchive::new(file) {
        Ok(archive) => !archive.is_empty(),
        Err(_) => false,
    }
}

/// Heuristic for the binary .osheet layout: a `schema` marker plus regions
/// shaped like `"sheets": {...}` and `"cells": {...}`.
pub fn is_binary_osheet(data: &[u8]) -> bool {
    let text = String::from_utf8_lossy(data);

    if !text.contains("schema") {
        return false;
    }

    let sheets_pattern = match Regex::new(r#""sheets":\s*\{[^}]*\}"#) {
        Ok(re) => re,
        Err(_) => return false,
    };
    if !sheets_pattern.is_match(&text) {
        return false;
    }

    let cells_pattern = match Regex::new(r#""cells":\s*\{[^}]*\}"#) {
        Ok(re) => re,
        Err(_) => return false,
    };
    cells_pattern.is_match(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn empty_file_is_unknown() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.osheet");
        File::create(&path).unwrap();
        assert_eq!(detect_format(&path).unwrap(), Format::Unknown);
    }

    #[test]
    fn plain_text_is_unknown() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.osheet");
        std::fs::write(&path, "just some text, nothing structured").unwrap();
        assert_eq!(detect_format(&path).unwrap(), Format::Unknown);
    }

    #[test]
    fn zip_magic_without_central_directory_is_not_zip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fake.osheet");
        let mut f = File::create(&path).unwrap();
        f.write_all(&ZIP_MAGIC).unwrap();
        f.write_all(b"garbage that is not a zip").unwrap();
        assert_ne!(detect_format(&path).unwrap(), Format::Zip);
    }

    #[test]
    fn binary_heuristic_requires_all_markers() {
        assert!(is_binary_osheet(
            br#"schema junk "sheets": {"sh_1": {"title": "S"}} more "cells": {"0": {}}"#
        ));
        // schema marker missing
        assert!(!is_binary_osheet(
            br#""sheets": {"a": 1} "cells": {"0": {}}"#
        ));
        // cells region missing
        assert!(!is_binary_osheet(br#"schema "sheets": {"a": 1}"#));
    }

    #[test]
    fn binary_file_detected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bin.osheet");
        std::fs::write(
            &path,
            br#"schema enc id ver {"gcVer": 1, "sheets": {"sh_1": {"title": "S"}}} text/sh_1 {"cells": {"0": {"0": {"v": "1"}}}}"#,
        )
        .unwrap();
        assert_eq!(detect_format(&path).unwrap(), Format::Binary);
    }
}
