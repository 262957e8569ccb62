//! osheet2xlsx - convert .osheet spreadsheet containers to .xlsx
//!
//! This library normalizes .osheet documents (an ad-hoc container format
//! whose internal schema varies across producer versions) into a canonical
//! in-memory spreadsheet model, and writes that model out as an Excel
//! workbook.
//!
//! # Features
//!
//! - Automatic container format detection (ZIP, binary, unknown)
//! - Schema-tolerant `document.json` parsing (V1/V2/V3 variants, no version tag)
//! - Heuristic extraction of embedded JSON from binary streams
//! - Cell type inference (numbers with locale separators, dates, epochs, bools)
//! - Structural validation with stable machine-readable issue codes
//!
//! # Example
//!
//! ```no_run
//! use osheet2xlsx::reader::read_book_universal;
//! use osheet2xlsx::xlsx::write_book;
//! use std::path::Path;
//!
//! let book = read_book_universal(Path::new("report.osheet"))?;
//! println!("Sheets: {}", book.sheets.len());
//! write_book(&book, Path::new("report.xlsx"))?;
//! # Ok::<(), osheet2xlsx::error::OsheetError>(())
//! ```

pub mod binary;
pub mod cli;
pub mod config;
pub mod convert;
pub mod detect;
pub mod error;
pub mod infer;
pub mod reader;
pub mod scan;
pub mod types;
pub mod validate;
pub mod xlsx;

// Re-export commonly used types
pub use error::{OsheetError, OsheetResult};
pub use types::{
    Book, Cell, CellValue, ColSpec, Format, Merge, RowSpec, Sheet, ValidationIssue,
};
