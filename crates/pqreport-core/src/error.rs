//! Error types for report conversion operations.

use thiserror::Error;

/// Errors that can abort a workbook-to-report conversion.
///
/// Cell-level anomalies (non-numeric or absent values) are deliberately not
/// represented here: extraction absorbs them by coercing to `0.0`. Only
/// structural failures — a missing worksheet, an unusable template, an
/// unwritable output — surface to the caller.
#[derive(Error, Debug)]
pub enum ReportError {
    /// A required worksheet is missing or misnamed.
    ///
    /// Fatal: every downstream coordinate lookup assumes the three fixed
    /// sheets exist, and proceeding would only fail later with confusing
    /// index arithmetic.
    #[error("worksheet not found: {0}")]
    SheetNotFound(String),

    /// The workbook container could not be opened or read.
    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    /// The template document is unreadable or does not contain the tables
    /// the report layout expects.
    #[error("template error: {0}")]
    Template(String),

    /// The output document could not be assembled or serialized.
    #[error("document error: {0}")]
    Document(String),

    /// Output directory or file is not writable.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used across the engine.
pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ReportError::SheetNotFound("电压谐波".to_string());
        assert_eq!(err.to_string(), "worksheet not found: 电压谐波");

        let err = ReportError::Template("only 2 tables".to_string());
        assert_eq!(err.to_string(), "template error: only 2 tables");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ReportError = io.into();
        assert!(matches!(err, ReportError::Io(_)));
    }
}
