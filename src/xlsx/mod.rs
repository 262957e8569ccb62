//! Best-effort writer of the canonical model into an .xlsx workbook.
//!
//! Cells with a non-empty formula are written as formulas; DateTime serials
//! are written as numbers with a date display format. Malformed merges, column
//! widths and row heights are skipped with a warning, never aborting the
//! write.

use crate::error::OsheetResult;
use crate::types::{Book, CellValue, Sheet};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

const DATE_NUM_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Write a book to an .xlsx file.
pub fn write_book(book: &Book, output: &Path) -> OsheetResult<()> {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format(DATE_NUM_FORMAT);

    let mut used_names: HashSet<String> = HashSet::new();
    for sheet in &book.sheets {
        let worksheet = workbook.add_worksheet();
        let name = unique_sheet_name(&sheet.name, &mut used_names);
        if let Err(e) = worksheet.set_name(&name) {
            warn!(sheet = %sheet.name, error = %e, "failed to set sheet name, keeping default");
        }
        write_sheet(worksheet, sheet, &date_format);
    }

    workbook.save(output)?;
    Ok(())
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &Sheet, date_format: &Format) {
    // Merges go in first so cell values land on top of the merged anchors
    for merge in &sheet.merges {
        if !merge.is_valid() {
            continue;
        }
        let result = worksheet.merge_range(
            (merge.start_row - 1) as u32,
            (merge.start_col - 1) as u16,
            (merge.end_row - 1) as u32,
            (merge.end_col - 1) as u16,
            "",
            &Format::default(),
        );
        if let Err(e) = result {
            warn!(error = %e, "skipping merge range");
        }
    }

    for (r, row) in sheet.cells.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let row_idx = r as u32;
            let col_idx = c as u16;

            // Formula takes precedence over the typed value
            if let Some(formula) = cell.formula.as_deref().filter(|f| !f.is_empty()) {
                if let Err(e) = worksheet.write_formula(row_idx, col_idx, formula) {
                    warn!(row = r, col = c, error = %e, "skipping formula cell");
                }
                continue;
            }

            let result = match &cell.value {
                CellValue::Empty => Ok(&mut *worksheet),
                CellValue::String(s) => worksheet.write_string(row_idx, col_idx, s),
                CellValue::Number(n) => worksheet.write_number(row_idx, col_idx, *n),
                CellValue::Bool(b) => worksheet.write_boolean(row_idx, col_idx, *b),
                CellValue::DateTime(serial) => {
                    worksheet.write_number_with_format(row_idx, col_idx, *serial, date_format)
                }
            };
            if let Err(e) = result {
                warn!(row = r, col = c, error = %e, "skipping cell");
            }
        }
    }

    for col in &sheet.cols {
        if col.index < 1 || col.index > i64::from(u16::MAX) || col.width <= 0.0 {
            continue;
        }
        if let Err(e) = worksheet.set_column_width((col.index - 1) as u16, col.width) {
            warn!(index = col.index, error = %e, "skipping column width");
        }
    }

    for row in &sheet.rows {
        if row.index < 1 || row.index > i64::from(u32::MAX) || row.height <= 0.0 {
            continue;
        }
        if let Err(e) = worksheet.set_row_height((row.index - 1) as u32, row.height) {
            warn!(index = row.index, error = %e, "skipping row height");
        }
    }
}

/// Worksheet names must be unique within a workbook; duplicate source names
/// get a numeric suffix.
fn unique_sheet_name(name: &str, used: &mut HashSet<String>) -> String {
    let base = if name.is_empty() { "Sheet" } else { name };
    // Excel caps sheet names at 31 chars
    let base: String = base.chars().take(31).collect();
    let mut candidate = base.clone();
    let mut n = 1;
    while !used.insert(candidate.clone()) {
        n += 1;
        let suffix = format!(" ({n})");
        let keep = 31usize.saturating_sub(suffix.chars().count());
        candidate = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
    }
    candidate
}
