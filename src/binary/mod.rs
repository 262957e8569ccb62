//! Extraction of embedded JSON fragments from binary .osheet streams.
//!
//! The binary layout has no formal grammar. Two JSON objects are located by
//! marker text and pulled out by brace balancing: a root object carrying the
//! `sheets` metadata map, and a sheet-data object carrying the sparse `cells`
//! map. Every structural failure has its own error variant; once the binary
//! path has been committed to there is no further fallback.

use crate::error::{OsheetError, OsheetResult};
use crate::infer::infer_cell;
use crate::types::{Book, Cell, ColSpec, Sheet};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Marker preceding the root JSON object.
const ROOT_JSON_MARKER: &str = "{\"gcVer\"";

/// Marker preceding the sheet-data segment.
const SHEET_DATA_MARKER: &str = "text/sh_1";

/// Sheet title used when the metadata carries none.
const DEFAULT_TITLE: &str = "Sheet";

/// Sparse intermediate representation of a binary .osheet sheet.
///
/// Row and column keys are parsed integer indices; source keys that are not
/// decimal integers are skipped. Ordered maps keep downstream conversion
/// deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BinarySheet {
    pub title: String,
    /// row index -> column index -> cell
    pub cells: BTreeMap<u32, BTreeMap<u32, BinaryCell>>,
    /// column index -> width
    pub cols: BTreeMap<u32, f64>,
}

/// A single cell in the binary format: a raw value string plus an optional
/// style id (carried for inspection, unused by conversion).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BinaryCell {
    pub value: String,
    pub style: Option<i64>,
}

/// Read a binary .osheet file and convert it into a single-sheet [`Book`].
pub fn read_binary_book(path: &Path) -> OsheetResult<Book> {
    let data = std::fs::read(path)?;
    let binary = parse_binary_sheet(&data)?;
    let sheet = binary_sheet_to_sheet(&binary);
    Ok(Book {
        title: path.display().to_string(),
        sheets: vec![sheet],
    })
}

/// Extract the sparse sheet representation from a binary stream.
pub fn parse_binary_sheet(data: &[u8]) -> OsheetResult<BinarySheet> {
    let text = String::from_utf8_lossy(data);

    let root_start = text.find(ROOT_JSON_MARKER).ok_or(OsheetError::NoRootJson)?;
    let root_json = extract_balanced_json(&text[root_start..])?;
    let root: Value = serde_json::from_str(root_json)?;

    let sheets = root
        .get("sheets")
        .and_then(Value::as_object)
        .ok_or(OsheetError::NoSheetsObject)?;

    // First sheet carrying a title, in key order; the source map has no
    // inherent ordering of its own
    let mut sheet_keys: Vec<&String> = sheets.keys().collect();
    sheet_keys.sort();
    let title = sheet_keys
        .iter()
        .find_map(|k| sheets[*k].get("title").and_then(Value::as_str))
        .unwrap_or(DEFAULT_TITLE)
        .to_string();

    let data_start = text
        .find(SHEET_DATA_MARKER)
        .ok_or(OsheetError::NoSheetDataSection)?;
    let after_marker = &text[data_start..];
    let json_offset = after_marker
        .find('{')
        .ok_or(OsheetError::NoSheetDataSection)?;
    let sheet_json = extract_balanced_json(&after_marker[json_offset..])?;
    let sheet_data: Value = serde_json::from_str(sheet_json)?;

    let raw_cells = sheet_data
        .get("cells")
        .and_then(Value::as_object)
        .ok_or(OsheetError::NoCellsData)?;

    let mut cells: BTreeMap<u32, BTreeMap<u32, BinaryCell>> = BTreeMap::new();
    for (row_key, row_value) in raw_cells {
        let Ok(row) = row_key.parse::<u32>() else {
            continue;
        };
        let Some(row_map) = row_value.as_object() else {
            continue;
        };
        let parsed_row = cells.entry(row).or_default();
        for (col_key, cell_value) in row_map {
            let Ok(col) = col_key.parse::<u32>() else {
                continue;
            };
            let Some(cell_map) = cell_value.as_object() else {
                continue;
            };
            parsed_row.insert(
                col,
                BinaryCell {
                    value: cell_map
                        .get("v")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    style: cell_map.get("s").and_then(Value::as_i64),
                },
            );
        }
    }

    let mut cols = BTreeMap::new();
    if let Some(raw_cols) = sheet_data.get("cols").and_then(Value::as_object) {
        for (col_key, col_value) in raw_cols {
            let Ok(col) = col_key.parse::<u32>() else {
                continue;
            };
            if let Some(width) = col_value.get("w").and_then(Value::as_f64) {
                cols.insert(col, width);
            }
        }
    }

    Ok(BinarySheet { title, cells, cols })
}

/// Slice the complete JSON object starting at the first byte of `text` by
/// counting braces until balance returns to zero.
fn extract_balanced_json(text: &str) -> OsheetResult<&str> {
    let mut depth = 0usize;
    for (i, b) in text.bytes().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(&text[..=i]);
                }
            }
            _ => {}
        }
    }
    Err(OsheetError::UnbalancedJson)
}

/// Project the sparse representation onto a dense rectangular [`Sheet`].
///
/// The grid is sized by the maximum row/column indices present; absent cells
/// stay empty, present values are classified through the inference engine.
/// Merges and row heights are not representable in the binary format.
pub fn binary_sheet_to_sheet(binary: &BinarySheet) -> Sheet {
    let max_row = binary.cells.keys().next_back().copied();
    let max_col = binary
        .cells
        .values()
        .filter_map(|row| row.keys().next_back())
        .max()
        .copied();

    let (height, width) = match (max_row, max_col) {
        (Some(r), Some(c)) => (r as usize + 1, c as usize + 1),
        _ => (0, 0),
    };

    let mut cells = vec![vec![Cell::default(); width]; height];
    for (&row, row_map) in &binary.cells {
        for (&col, cell) in row_map {
            cells[row as usize][col as usize] = infer_cell(&cell.value);
        }
    }

    // Column keys carry over verbatim as 1-based indices; a "0" key is
    // dropped later by the writer's index check
    let cols = binary
        .cols
        .iter()
        .map(|(&index, &width)| ColSpec {
            index: i64::from(index),
            width,
        })
        .filter(|c| c.width > 0.0)
        .collect();

    Sheet {
        name: binary.title.clone(),
        width,
        height,
        cells,
        cols,
        ..Sheet::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;
    use pretty_assertions::assert_eq;

    fn sample_stream() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"\x01\x02schema enc id ver\x00");
        data.extend_from_slice(
            br#"{"gcVer": 2, "sheets": {"sh_1": {"title": "Report"}}}"#,
        );
        data.extend_from_slice(b"\x00garbage\x00text/sh_1 ");
        data.extend_from_slice(
            br#"{"cells": {"0": {"0": {"v": "5"}, "2": {"v": "true", "s": 3}}, "1": {"1": {"v": "x"}}, "bad": {"0": {"v": "skipped"}}}, "cols": {"0": {"w": 18.5}, "oops": {"w": 4.0}}}"#,
        );
        data
    }

    #[test]
    fn parses_sparse_sheet() {
        let binary = parse_binary_sheet(&sample_stream()).unwrap();
        assert_eq!(binary.title, "Report");
        assert_eq!(binary.cells.len(), 2); // "bad" row key skipped
        assert_eq!(binary.cells[&0][&0].value, "5");
        assert_eq!(binary.cells[&0][&2].style, Some(3));
        assert_eq!(binary.cols.len(), 1); // "oops" col key skipped
        assert_eq!(binary.cols[&0], 18.5);
    }

    #[test]
    fn converts_to_dense_sheet() {
        let binary = parse_binary_sheet(&sample_stream()).unwrap();
        let sheet = binary_sheet_to_sheet(&binary);
        assert_eq!(sheet.name, "Report");
        assert_eq!((sheet.width, sheet.height), (3, 2));
        for row in &sheet.cells {
            assert_eq!(row.len(), sheet.width);
        }
        assert_eq!(sheet.cells[0][0].value, CellValue::Number(5.0));
        assert_eq!(sheet.cells[0][1].value, CellValue::Empty);
        assert_eq!(sheet.cells[0][2].value, CellValue::Bool(true));
        assert_eq!(sheet.cells[1][1].value, CellValue::String("x".to_string()));
        assert_eq!(sheet.cols, vec![ColSpec { index: 0, width: 18.5 }]);
        assert!(sheet.merges.is_empty());
        assert!(sheet.rows.is_empty());
    }

    #[test]
    fn missing_root_marker() {
        let err = parse_binary_sheet(b"no markers here").unwrap_err();
        assert!(matches!(err, OsheetError::NoRootJson));
    }

    #[test]
    fn missing_sheet_data_section() {
        let data = br#"{"gcVer": 1, "sheets": {"sh_1": {"title": "T"}}}"#;
        let err = parse_binary_sheet(data).unwrap_err();
        assert!(matches!(err, OsheetError::NoSheetDataSection));
    }

    #[test]
    fn missing_cells_map() {
        let mut data = Vec::new();
        data.extend_from_slice(br#"{"gcVer": 1, "sheets": {"sh_1": {}}} text/sh_1 {"cols": {}}"#);
        let err = parse_binary_sheet(&data).unwrap_err();
        assert!(matches!(err, OsheetError::NoCellsData));
    }

    #[test]
    fn unbalanced_braces() {
        let data = br#"{"gcVer": 1, "sheets": {"sh_1": {}"#;
        let err = parse_binary_sheet(data).unwrap_err();
        assert!(matches!(err, OsheetError::UnbalancedJson));
    }

    #[test]
    fn default_title_when_absent() {
        let data = br#"{"gcVer": 1, "sheets": {"sh_1": {}}} text/sh_1 {"cells": {"0": {"0": {"v": "1"}}}}"#;
        let binary = parse_binary_sheet(data).unwrap();
        assert_eq!(binary.title, "Sheet");
    }

    #[test]
    fn empty_cells_map_yields_empty_grid() {
        let data = br#"{"gcVer": 1, "sheets": {}} text/sh_1 {"cells": {}}"#;
        let binary = parse_binary_sheet(data).unwrap();
        let sheet = binary_sheet_to_sheet(&binary);
        assert_eq!((sheet.width, sheet.height), (0, 0));
    }
}
