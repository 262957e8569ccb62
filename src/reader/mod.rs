//! Schema-tolerant parsing of ZIP-based .osheet containers.
//!
//! The primary `document.json` manifest has varied across producer versions
//! and carries no version tag, so each sheet element is trial-decoded against
//! an explicit list of schema variants in a fixed order:
//!
//! - **V1**: `rows` as `[][]string`, merges as `{SR, SC, ER, EC}` objects
//! - **V2**: `rows` as a loosely-typed 2-D array, rendered to literals
//! - **V3**: `cells` as a 2-D array of typed cell descriptors
//!
//! When the manifest yields nothing, legacy `sheets/*.json` entries are
//! probed, then a text-embed fallback, then a synthetic entry-listing sheet.

use crate::binary;
use crate::detect::detect_format;
use crate::error::{OsheetError, OsheetResult};
use crate::infer::{cell_from_json, infer_cell, json_to_string};
use crate::types::{Book, Cell, ColSpec, Format, Merge, RowSpec, Sheet};
use serde::Deserialize;
use serde_json::Value;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Cap on embedded text per sheet entry in the fallback path.
const TEXT_EMBED_LIMIT: usize = 32 * 1024;

/// Appended when embedded text hits [`TEXT_EMBED_LIMIT`].
const TRIMMED_MARKER: &str = "\n<trimmed>";

/// A fully-buffered container entry. Once the archive is drained into these,
/// the source file handle is closed and the result is self-sufficient.
pub(crate) struct Entry {
    pub(crate) name: String,
    pub(crate) is_dir: bool,
    pub(crate) data: Vec<u8>,
}

impl Entry {
    fn basename(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    fn is_sheet_json(&self) -> bool {
        !self.is_dir
            && self.name.starts_with("sheets/")
            && self.name.to_lowercase().ends_with(".json")
    }

    fn is_under_sheets(&self) -> bool {
        !self.is_dir && self.name.starts_with("sheets/")
    }
}

/// Drain a ZIP container into memory.
pub(crate) fn read_entries(path: &Path) -> OsheetResult<Vec<Entry>> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        let is_dir = entry.is_dir();
        let mut data = Vec::new();
        if !is_dir {
            entry.read_to_end(&mut data)?;
        }
        entries.push(Entry { name, is_dir, data });
    }
    Ok(entries)
}

/// Detect the container format and read the book accordingly.
///
/// An unrecognized container is a hard error, never an empty book.
pub fn read_book_universal(path: &Path) -> OsheetResult<Book> {
    match detect_format(path)? {
        Format::Zip => read_book(path),
        Format::Binary => binary::read_binary_book(path),
        Format::Unknown => Err(OsheetError::UnknownFormat(path.to_path_buf())),
    }
}

/// Parse a ZIP-based .osheet container into a [`Book`].
///
/// Resolution order: `document.json` manifest, then legacy `sheets/*.json`
/// entries (first parseable file wins), then the text-embed fallback, then a
/// synthetic sheet listing archive entries. First non-empty result wins.
pub fn read_book(path: &Path) -> OsheetResult<Book> {
    let entries = match read_entries(path) {
        Ok(entries) if !entries.is_empty() => entries,
        _ => return Err(OsheetError::NotOsheet(path.to_path_buf())),
    };

    let mut sheets = try_parse_document_json(&entries).unwrap_or_default();

    if sheets.is_empty() {
        for entry in entries.iter().filter(|e| e.is_sheet_json()) {
            if let Some(sheet) = try_parse_sheet_json(entry.basename(), &entry.data) {
                sheets.push(sheet);
                break;
            }
        }
    }

    // No JSON sheets: embed text content for anything under sheets/
    if sheets.is_empty() {
        for entry in entries.iter().filter(|e| e.is_under_sheets()) {
            sheets.push(text_embed_sheet(entry));
        }
    }

    // Still nothing: list archive entries
    if sheets.is_empty() {
        sheets.push(archive_listing_sheet(&entries));
    }

    Ok(Book {
        title: path.display().to_string(),
        sheets,
    })
}

fn text_embed_sheet(entry: &Entry) -> Sheet {
    let mut content = String::from_utf8_lossy(&entry.data[..entry.data.len().min(TEXT_EMBED_LIMIT)])
        .into_owned();
    if entry.data.len() >= TEXT_EMBED_LIMIT {
        content.push_str(TRIMMED_MARKER);
    }
    Sheet {
        name: entry.basename().to_string(),
        width: 1,
        height: 1,
        cells: vec![vec![Cell::string(content)]],
        ..Sheet::default()
    }
}

fn archive_listing_sheet(entries: &[Entry]) -> Sheet {
    let cells: Vec<Vec<Cell>> = entries
        .iter()
        .map(|e| vec![Cell::string(e.name.clone())])
        .collect();
    Sheet {
        name: "archive".to_string(),
        width: 1,
        height: cells.len(),
        cells,
        ..Sheet::default()
    }
}

//==============================================================================
// document.json manifest
//==============================================================================

#[derive(Deserialize, Default)]
#[serde(default)]
struct DocumentJson {
    sheets: Vec<Value>,
}

/// Parse the `document.json` manifest if present; `None` when it is missing,
/// unparseable, or yields zero sheets.
pub(crate) fn try_parse_document_json(entries: &[Entry]) -> Option<Vec<Sheet>> {
    let doc = entries
        .iter()
        .find(|e| !e.is_dir && e.basename().eq_ignore_ascii_case("document.json"))?;

    let parsed: DocumentJson = serde_json::from_slice(&doc.data).ok()?;
    if parsed.sheets.is_empty() {
        return None;
    }

    let mut out = Vec::new();
    for (i, raw) in parsed.sheets.iter().enumerate() {
        match parse_document_sheet(raw) {
            Some(sheet) => out.push(sheet),
            // A sheet element matching no known schema is skipped, not fatal
            None => debug!(index = i, "manifest sheet matches no known schema"),
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct MergeV1 {
    #[serde(rename = "SR")]
    sr: i64,
    #[serde(rename = "SC")]
    sc: i64,
    #[serde(rename = "ER")]
    er: i64,
    #[serde(rename = "EC")]
    ec: i64,
}

#[derive(Deserialize, Default, Clone, Copy)]
#[serde(default)]
struct ColJson {
    index: i64,
    width: f64,
}

#[derive(Deserialize, Default, Clone, Copy)]
#[serde(default)]
struct RowJson {
    index: i64,
    height: f64,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct SheetV1 {
    name: String,
    rows: Vec<Vec<String>>,
    merges: Vec<MergeV1>,
    cols: Vec<ColJson>,
    #[serde(rename = "rowHeights")]
    row_heights: Vec<RowJson>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct SheetV2 {
    name: String,
    rows: Vec<Vec<Value>>,
    merges: Value,
    cols: Vec<ColJson>,
    #[serde(rename = "rowHeights")]
    row_heights: Vec<RowJson>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct SheetV3 {
    name: String,
    cells: Vec<Vec<Value>>,
    merges: Value,
    cols: Vec<ColJson>,
    #[serde(rename = "rowHeights")]
    row_heights: Vec<RowJson>,
}

/// Trial-decode one manifest sheet element against V1, V2, V3 in order.
fn parse_document_sheet(raw: &Value) -> Option<Sheet> {
    // V1: rows as [][]string
    if let Ok(v1) = serde_json::from_value::<SheetV1>(raw.clone()) {
        if !v1.rows.is_empty() || !v1.merges.is_empty() || !v1.cols.is_empty() {
            let merges = v1
                .merges
                .iter()
                .map(|m| Merge {
                    start_row: m.sr,
                    start_col: m.sc,
                    end_row: m.er,
                    end_col: m.ec,
                })
                .filter(Merge::is_valid)
                .collect();
            return Some(sheet_from_rows(
                default_name(&v1.name, "Sheet"),
                v1.rows,
                merges,
                col_specs(&v1.cols),
                row_specs(&v1.row_heights),
            ));
        }
    }

    // V2: rows as loosely-typed values, rendered to string literals
    if let Ok(v2) = serde_json::from_value::<SheetV2>(raw.clone()) {
        if !v2.rows.is_empty() {
            let rows = v2
                .rows
                .iter()
                .map(|row| row.iter().map(json_to_string).collect())
                .collect();
            return Some(sheet_from_rows(
                default_name(&v2.name, "Sheet"),
                rows,
                parse_flexible_merges(&v2.merges),
                col_specs(&v2.cols),
                row_specs(&v2.row_heights),
            ));
        }
    }

    // V3: cells as typed descriptors
    if let Ok(v3) = serde_json::from_value::<SheetV3>(raw.clone()) {
        if !v3.cells.is_empty() {
            let height = v3.cells.len();
            let width = v3.cells.iter().map(Vec::len).max().unwrap_or(0);
            let cells = v3
                .cells
                .iter()
                .map(|row| {
                    let mut out: Vec<Cell> = row.iter().map(cell_from_json).collect();
                    out.resize(width, Cell::default());
                    out
                })
                .collect();
            return Some(Sheet {
                name: default_name(&v3.name, "Sheet"),
                width,
                height,
                cells,
                merges: parse_flexible_merges(&v3.merges),
                cols: col_specs(&v3.cols),
                rows: row_specs(&v3.row_heights),
            });
        }
    }

    None
}

fn col_specs(cols: &[ColJson]) -> Vec<ColSpec> {
    cols.iter()
        .map(|c| ColSpec {
            index: c.index,
            width: c.width,
        })
        .filter(|c| c.width > 0.0)
        .collect()
}

fn row_specs(rows: &[RowJson]) -> Vec<RowSpec> {
    rows.iter()
        .map(|r| RowSpec {
            index: r.index,
            height: r.height,
        })
        .filter(|r| r.height > 0.0)
        .collect()
}

fn default_name(name: &str, fallback: &str) -> String {
    if name.is_empty() {
        fallback.to_string()
    } else {
        name.to_string()
    }
}

/// Build a dense rectangular sheet from string rows, padding short rows with
/// empty cells and classifying every value through the inference engine.
fn sheet_from_rows(
    name: String,
    rows: Vec<Vec<String>>,
    merges: Vec<Merge>,
    cols: Vec<ColSpec>,
    row_specs: Vec<RowSpec>,
) -> Sheet {
    let height = rows.len();
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let cells = rows
        .into_iter()
        .map(|row| {
            let mut out: Vec<Cell> = row.iter().map(|s| infer_cell(s)).collect();
            out.resize(width, Cell::default());
            out
        })
        .collect();
    Sheet {
        name,
        width,
        height,
        cells,
        merges,
        cols,
        rows: row_specs,
    }
}

/// Parse merges in any supported shape: an array of `[sr, sc, er, ec]` tuples
/// or an array of objects with aliased corner keys. For aliased keys the first
/// present alias wins (`SR`, `sr`, `r1`, `startRow` and analogues). Ranges
/// failing the validity invariant are dropped.
pub(crate) fn parse_flexible_merges(m: &Value) -> Vec<Merge> {
    const SR_KEYS: [&str; 4] = ["SR", "sr", "r1", "startRow"];
    const SC_KEYS: [&str; 4] = ["SC", "sc", "c1", "startCol"];
    const ER_KEYS: [&str; 4] = ["ER", "er", "r2", "endRow"];
    const EC_KEYS: [&str; 4] = ["EC", "ec", "c2", "endCol"];

    let Value::Array(items) = m else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for item in items {
        let merge = match item {
            Value::Object(obj) => Merge {
                start_row: first_alias(obj, &SR_KEYS),
                start_col: first_alias(obj, &SC_KEYS),
                end_row: first_alias(obj, &ER_KEYS),
                end_col: first_alias(obj, &EC_KEYS),
            },
            Value::Array(tuple) if tuple.len() == 4 => Merge {
                start_row: to_i64(&tuple[0]),
                start_col: to_i64(&tuple[1]),
                end_row: to_i64(&tuple[2]),
                end_col: to_i64(&tuple[3]),
            },
            _ => continue,
        };
        if merge.is_valid() {
            out.push(merge);
        }
    }
    out
}

fn first_alias(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> i64 {
    keys.iter()
        .find_map(|k| obj.get(*k))
        .map(to_i64)
        .unwrap_or(0)
}

fn to_i64(v: &Value) -> i64 {
    v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)).unwrap_or(0)
}

//==============================================================================
// Legacy sheets/*.json entries
//==============================================================================

/// Parse a standalone sheet JSON file with simple, predefined shapes:
/// `{"name": "...", "rows": [[...]]}`, a bare 2-D array, or `{"rows": [[...]]}`.
pub(crate) fn try_parse_sheet_json(file_base: &str, data: &[u8]) -> Option<Sheet> {
    let fallback = file_base.trim_end_matches(".json");

    #[derive(Deserialize, Default)]
    #[serde(default)]
    struct NamedRows {
        name: String,
        rows: Vec<Vec<String>>,
    }

    if let Ok(named) = serde_json::from_slice::<NamedRows>(data) {
        if !named.rows.is_empty() {
            return Some(sheet_from_rows(
                default_name(&named.name, fallback),
                named.rows,
                Vec::new(),
                Vec::new(),
                Vec::new(),
            ));
        }
    }

    if let Ok(rows) = serde_json::from_slice::<Vec<Vec<String>>>(data) {
        if !rows.is_empty() {
            return Some(sheet_from_rows(
                fallback.to_string(),
                rows,
                Vec::new(),
                Vec::new(),
                Vec::new(),
            ));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn v1_schema_with_merges_and_cols() {
        let raw = json!({
            "name": "Budget",
            "rows": [["a", "1"], ["b", "2"]],
            "merges": [{"SR": 1, "SC": 1, "ER": 1, "EC": 2}],
            "cols": [{"index": 1, "width": 20.0}, {"index": 2, "width": 0.0}],
            "rowHeights": [{"index": 1, "height": 30.0}, {"index": 2, "height": -5.0}]
        });
        let sheet = parse_document_sheet(&raw).unwrap();
        assert_eq!(sheet.name, "Budget");
        assert_eq!((sheet.width, sheet.height), (2, 2));
        assert_eq!(sheet.merges.len(), 1);
        // zero-width col and negative-height row are dropped
        assert_eq!(sheet.cols.len(), 1);
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.cells[0][1].value, CellValue::Number(1.0));
    }

    #[test]
    fn v2_schema_renders_loose_values() {
        let raw = json!({
            "name": "Loose",
            "rows": [["x", 12.5, true, null]]
        });
        let sheet = parse_document_sheet(&raw).unwrap();
        assert_eq!((sheet.width, sheet.height), (4, 1));
        assert_eq!(sheet.cells[0][0].value, CellValue::String("x".to_string()));
        assert_eq!(sheet.cells[0][1].value, CellValue::Number(12.5));
        assert_eq!(sheet.cells[0][2].value, CellValue::Bool(true));
        assert_eq!(sheet.cells[0][3].value, CellValue::Empty);
    }

    #[test]
    fn v3_schema_with_typed_descriptors() {
        let raw = json!({
            "name": "Typed",
            "cells": [
                [{"t": "n", "v": 5.0}, {"t": "s", "v": "note", "f": "A1&\"!\""}],
                ["plain"]
            ]
        });
        let sheet = parse_document_sheet(&raw).unwrap();
        assert_eq!((sheet.width, sheet.height), (2, 2));
        assert_eq!(sheet.cells[0][0].value, CellValue::Number(5.0));
        assert_eq!(sheet.cells[0][1].formula.as_deref(), Some("A1&\"!\""));
        // short second row is padded to width
        assert_eq!(sheet.cells[1][1], Cell::default());
    }

    #[test]
    fn unknown_shape_is_skipped() {
        assert!(parse_document_sheet(&json!({"name": "empty"})).is_none());
        assert!(parse_document_sheet(&json!(42)).is_none());
    }

    #[test]
    fn jagged_rows_are_padded_rectangular() {
        let sheet = sheet_from_rows(
            "S".to_string(),
            vec![
                vec!["a".to_string()],
                vec!["b".to_string(), "c".to_string(), "d".to_string()],
            ],
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        assert_eq!((sheet.width, sheet.height), (3, 2));
        for row in &sheet.cells {
            assert_eq!(row.len(), sheet.width);
        }
    }

    #[test]
    fn merge_alias_first_present_wins() {
        // Both SR and startRow present: SR is the first alias, so it wins
        // and the values are not combined.
        let merges = parse_flexible_merges(&json!([
            {"SR": 2, "startRow": 7, "SC": 1, "ER": 3, "EC": 2}
        ]));
        assert_eq!(merges.len(), 1);
        assert_eq!(merges[0].start_row, 2);
    }

    #[test]
    fn merge_tuples_and_invalid_ranges() {
        let merges = parse_flexible_merges(&json!([
            [1, 1, 2, 2],
            [0, 1, 2, 2],      // start_row < 1: dropped
            [3, 3, 2, 4],      // inverted rows: dropped
            "noise"
        ]));
        assert_eq!(merges.len(), 1);
        assert_eq!(
            merges[0],
            Merge { start_row: 1, start_col: 1, end_row: 2, end_col: 2 }
        );
    }

    #[test]
    fn merge_object_aliases() {
        let merges = parse_flexible_merges(&json!([
            {"r1": 1, "c1": 2, "r2": 3, "c2": 4},
            {"startRow": 5, "startCol": 5, "endRow": 6, "endCol": 6}
        ]));
        assert_eq!(merges.len(), 2);
        assert_eq!(merges[0].start_col, 2);
        assert_eq!(merges[1].end_row, 6);
    }

    #[test]
    fn sheet_json_shapes() {
        let named = br#"{"name": "S1", "rows": [["a", "b"]]}"#;
        let sheet = try_parse_sheet_json("Sheet1.json", named).unwrap();
        assert_eq!(sheet.name, "S1");
        assert_eq!((sheet.width, sheet.height), (2, 1));

        let bare = br#"[["a"], ["b"]]"#;
        let sheet = try_parse_sheet_json("data.json", bare).unwrap();
        assert_eq!(sheet.name, "data");
        assert_eq!(sheet.height, 2);

        let rows_only = br#"{"rows": [["x"]]}"#;
        let sheet = try_parse_sheet_json("other.json", rows_only).unwrap();
        assert_eq!(sheet.name, "other");

        assert!(try_parse_sheet_json("bad.json", b"not json").is_none());
        assert!(try_parse_sheet_json("empty.json", b"{\"rows\": []}").is_none());
    }
}
