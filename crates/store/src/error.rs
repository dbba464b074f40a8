//! Errors raised by the local store.

use derive_more::{Display, Error};

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// SQLite could not be reached or a query failed.
    #[display("database error")]
    Database,
    /// The schema could not be brought up to date. Needs an operator.
    #[display("database migration error")]
    Migration,
    /// A file with this CID has already been recorded.
    #[display("a file with CID {_0} is already stored")]
    DuplicateCid(#[error(not(source))] String),
    /// Serialization/deserialization error.
    #[display("invalid stored data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database)
    }
}
