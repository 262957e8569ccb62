use std::path::PathBuf;
use thiserror::Error;

pub type OsheetResult<T> = Result<T, OsheetError>;

#[derive(Error, Debug)]
pub enum OsheetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported osheet layout or not a zip: {}", .0.display())]
    NotOsheet(PathBuf),

    #[error("unsupported or unknown format: {}", .0.display())]
    UnknownFormat(PathBuf),

    // Binary extraction diagnoses. Each structural failure gets its own
    // variant so callers can branch without matching message text.
    #[error("no root JSON object found")]
    NoRootJson,

    #[error("no sheets object in root JSON")]
    NoSheetsObject,

    #[error("no sheet data section found")]
    NoSheetDataSection,

    #[error("no cells data found")]
    NoCellsData,

    #[error("incomplete JSON object (unbalanced braces)")]
    UnbalancedJson,

    #[error("structure invalid: {code}: {message}")]
    Validation { code: &'static str, message: String },

    #[error("xlsx write error: {0}")]
    Xlsx(String),

    #[error("output exists: {}; use --overwrite to replace", .0.display())]
    OutputExists(PathBuf),

    #[error("no inputs found")]
    NoInputs,

    #[error("{failed} of {total} conversions failed")]
    PartialFailure { failed: usize, total: usize },
}

impl From<rust_xlsxwriter::XlsxError> for OsheetError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        OsheetError::Xlsx(e.to_string())
    }
}
