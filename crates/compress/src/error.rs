//! Errors raised while building or reading bundles.

use derive_more::{Display, Error};

/// A compression error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for compression operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Data is corrupt or malformed. Don't retry with the same input.
    #[display("invalid or corrupted data")]
    InvalidData,
    /// The requested format is not supported.
    #[display("unsupported format: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
    /// A name inside the bundle was rejected (empty, absolute, or escaping).
    #[display("invalid bundle entry name: {_0}")]
    InvalidEntry(#[error(not(source))] String),
    /// An I/O operation failed.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exn::ResultExt;

    #[test]
    fn test_messages_name_the_offending_value() {
        assert_eq!(ErrorKind::UnsupportedFormat("lz4".to_string()).to_string(), "unsupported format: lz4");
        assert_eq!(ErrorKind::InvalidEntry("../x".to_string()).to_string(), "invalid bundle entry name: ../x");
    }

    #[test]
    fn test_only_io_is_retryable() {
        assert!(ErrorKind::Io.is_retryable());
        assert!(!ErrorKind::InvalidData.is_retryable());
        assert!(!ErrorKind::InvalidEntry("a/b".to_string()).is_retryable());
    }

    #[test]
    fn test_io_failures_keep_their_source() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::StorageFull, "disk full"));
        let exn = result.or_raise(|| ErrorKind::Io).unwrap_err();
        assert_eq!(*exn, ErrorKind::Io);
        assert!(format!("{exn:?}").contains("disk full"));
    }
}
