use serde::Serialize;
use std::fmt;

//==============================================================================
// Canonical workbook model
//==============================================================================

/// A parsed osheet workbook.
///
/// Sheet order matches source order and is significant for output. Duplicate
/// sheet names are legal here; the xlsx writer deduplicates on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub title: String,
    pub sheets: Vec<Sheet>,
}

/// A single sheet with a dense, rectangular cell grid.
///
/// Every row holds exactly `width` cells (sparse or jagged sources are padded
/// with empty cells) and the grid holds exactly `height` rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    pub name: String,
    pub width: usize,
    pub height: usize,
    /// Row-major cell grid.
    pub cells: Vec<Vec<Cell>>,
    pub merges: Vec<Merge>,
    pub cols: Vec<ColSpec>,
    pub rows: Vec<RowSpec>,
}

/// A single cell: one typed value plus an optional formula.
///
/// A non-empty formula takes precedence over the value for consumers that can
/// evaluate or display formulas; the typed value remains as a display fallback.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub value: CellValue,
    pub formula: Option<String>,
}

/// Cell value kinds. Exactly one representation is ever active.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    String(String),
    Number(f64),
    Bool(bool),
    /// Day-count serial anchored at 1899-12-30T00:00:00Z, so a downstream
    /// writer can place it directly into a date-formatted numeric cell.
    DateTime(f64),
}

impl Cell {
    pub fn string(s: impl Into<String>) -> Self {
        Cell {
            value: CellValue::String(s.into()),
            formula: None,
        }
    }

    pub fn number(n: f64) -> Self {
        Cell {
            value: CellValue::Number(n),
            formula: None,
        }
    }

    pub fn bool(b: bool) -> Self {
        Cell {
            value: CellValue::Bool(b),
            formula: None,
        }
    }

    pub fn datetime(serial: f64) -> Self {
        Cell {
            value: CellValue::DateTime(serial),
            formula: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value == CellValue::Empty && self.formula.is_none()
    }
}

/// An inclusive merged cell range, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Merge {
    pub start_row: i64,
    pub start_col: i64,
    pub end_row: i64,
    pub end_col: i64,
}

impl Merge {
    /// Ranges that fail this check are dropped silently by the parsers,
    /// never surfaced as errors.
    pub fn is_valid(&self) -> bool {
        self.start_row > 0
            && self.start_col > 0
            && self.end_row >= self.start_row
            && self.end_col >= self.start_col
    }
}

/// Explicit column width, 1-based index. Width must be positive to be kept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColSpec {
    pub index: i64,
    pub width: f64,
}

/// Explicit row height, 1-based index. Height must be positive to be kept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowSpec {
    pub index: i64,
    pub height: f64,
}

//==============================================================================
// Detection and validation surfaces
//==============================================================================

/// Detected container format of an .osheet file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Unknown,
    Zip,
    Binary,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Zip => write!(f, "ZIP"),
            Format::Binary => write!(f, "Binary"),
            Format::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A structural problem discovered during validation.
///
/// `code` is a stable machine-readable identifier; changing one is a breaking
/// change for callers that map codes to exit statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub code: &'static str,
    pub message: String,
}

pub mod issue_codes {
    pub const NOT_ZIP: &str = "not_zip";
    pub const DOC_JSON_INVALID: &str = "doc_json_invalid";
    pub const SHEETS_JSON_INVALID: &str = "sheets_json_invalid";
    pub const NO_SHEETS: &str = "no_sheets";
}
