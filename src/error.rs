//! Error types for Gator.

use thiserror::Error;

/// Common error type for Gator.
#[derive(Error, Debug)]
pub enum GatorError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Bad command-line argument (interval, arity, unknown command).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// No feed could be selected for the current scrape cycle.
    #[error("feed selection failed: {0}")]
    SelectionFailed(String),

    /// Network or transport failure while fetching a feed.
    #[error("fetch failed: {0}")]
    FetchFailed(String),

    /// The fetched body is not a feed document.
    #[error("parse failed: {0}")]
    ParseFailed(String),

    /// A post could not be stored.
    #[error("insert failed: {0}")]
    InsertFailed(String),

    /// A post with this URL already exists.
    #[error("duplicate post URL: {0}")]
    DuplicateUrl(String),

    /// The operation was aborted by the shutdown signal.
    #[error("cancelled")]
    Cancelled,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for GatorError {
    fn from(e: sqlx::Error) -> Self {
        GatorError::Database(e.to_string())
    }
}

/// Result type alias for Gator operations.
pub type Result<T> = std::result::Result<T, GatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = GatorError::Validation("feed name is empty".to_string());
        assert_eq!(err.to_string(), "validation error: feed name is empty");
    }

    #[test]
    fn test_not_found_error_display() {
        let err = GatorError::NotFound("feed".to_string());
        assert_eq!(err.to_string(), "feed not found");
    }

    #[test]
    fn test_duplicate_url_display() {
        let err = GatorError::DuplicateUrl("http://x/1".to_string());
        assert_eq!(err.to_string(), "duplicate post URL: http://x/1");
    }

    #[test]
    fn test_invalid_argument_display() {
        let err = GatorError::InvalidArgument("interval must be positive".to_string());
        assert_eq!(err.to_string(), "invalid argument: interval must be positive");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GatorError = io_err.into();
        assert!(matches!(err, GatorError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_sqlx_error_conversion() {
        let err: GatorError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, GatorError::Database(_)));
    }

    #[test]
    fn test_result_alias() {
        fn sample_ok() -> Result<i32> {
            Ok(42)
        }

        fn sample_err() -> Result<i32> {
            Err(GatorError::Cancelled)
        }

        assert_eq!(sample_ok().unwrap(), 42);
        assert!(sample_err().is_err());
    }
}
