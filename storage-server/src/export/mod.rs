//! Record exports: CSV spreadsheet and receipt document

mod receipt;
mod spreadsheet;

pub use receipt::render_receipt;
pub use spreadsheet::{ImportRow, SpreadsheetError, export_csv, parse_import};

use shared::error::{AppError, ErrorCode};

impl From<SpreadsheetError> for AppError {
    fn from(e: SpreadsheetError) -> Self {
        match e {
            SpreadsheetError::NoKnownColumns | SpreadsheetError::Csv(_) => {
                AppError::with_message(ErrorCode::ImportFileInvalid, e.to_string())
            }
            SpreadsheetError::Flush(_) => {
                tracing::error!(error = %e, "CSV export failed");
                AppError::internal(e.to_string())
            }
        }
    }
}
