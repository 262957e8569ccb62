//! Single-file conversion pipeline: read an .osheet container, write .xlsx.

use crate::error::{OsheetError, OsheetResult};
use crate::reader;
use crate::xlsx;
use std::path::{Path, PathBuf};
use tracing::info;

/// Convert one input file, returning the path of the produced .xlsx.
///
/// When `output` is `None` the output name is derived from the input file
/// stem. Existing outputs are refused unless `overwrite` is set.
pub fn convert_single(
    input: &Path,
    output: Option<&Path>,
    overwrite: bool,
) -> OsheetResult<PathBuf> {
    let out = match output {
        Some(path) => path.to_path_buf(),
        None => derive_output_name(input),
    };

    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    if !overwrite && out.exists() {
        return Err(OsheetError::OutputExists(out));
    }

    let book = reader::read_book_universal(input)?;
    info!(
        input = %input.display(),
        output = %out.display(),
        sheets = book.sheets.len(),
        "converting"
    );
    xlsx::write_book(&book, &out)?;
    Ok(out)
}

/// `<stem>.xlsx` next to the input file.
pub fn derive_output_name(input: &Path) -> PathBuf {
    input.with_extension("xlsx")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_name_derivation() {
        assert_eq!(
            derive_output_name(Path::new("dir/report.osheet")),
            PathBuf::from("dir/report.xlsx")
        );
        assert_eq!(
            derive_output_name(Path::new("noext")),
            PathBuf::from("noext.xlsx")
        );
    }
}
