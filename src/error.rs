//! Application Error Types
//!
//! Errors that stop the server from starting or keep running. Failures of a
//! single request never end up here; see [`crate::http::error`].

use derive_more::{Display, Error};

/// An application error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for application startup and shutdown.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("invalid configuration")]
    Config,
    #[display("could not initialize logging")]
    Logging,
    #[display("could not open the database")]
    Database,
    #[display("could not set up the Powergate client")]
    Powergate,
    /// A bundled page template failed to compile.
    #[display("invalid page template `{_0}`")]
    Template(#[error(not(source))] String),
    #[display("HTTP server error")]
    Server,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database | Self::Server)
    }
}
