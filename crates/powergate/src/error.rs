//! Powergate Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. The adapter never retries; callers decide what a
//! failure means for them.

use derive_more::{Display, Error};

/// An adapter error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The service could not be reached, or did not answer in time.
    #[display("Powergate is unavailable")]
    Unavailable,
    /// The service answered, but rejected the request or replied with
    /// something that makes no sense.
    #[display("Powergate error: {_0}")]
    Backend(#[error(not(source))] String),
    /// Content could not be added to the hot storage layer.
    #[display("staging failed")]
    Staging,
    /// The profile token was refused (or cannot be sent at all).
    #[display("invalid FFS token")]
    InvalidToken,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }

    /// Classify a gRPC status returned by the service.
    pub(crate) fn from_status(status: &tonic::Status) -> Self {
        use tonic::Code;
        match status.code() {
            Code::Unavailable | Code::DeadlineExceeded | Code::Cancelled => Self::Unavailable,
            Code::Unauthenticated | Code::PermissionDenied => Self::InvalidToken,
            _ => Self::Backend(status.message().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tonic::{Code, Status};

    #[rstest]
    #[case(Code::Unavailable, true)]
    #[case(Code::DeadlineExceeded, true)]
    #[case(Code::Unauthenticated, false)]
    #[case(Code::Internal, false)]
    fn test_status_classification(#[case] code: Code, #[case] retryable: bool) {
        let kind = ErrorKind::from_status(&Status::new(code, "boom"));
        assert_eq!(kind.is_retryable(), retryable);
    }

    #[test]
    fn test_backend_message_is_kept() {
        let kind = ErrorKind::from_status(&Status::new(Code::InvalidArgument, "cid not found"));
        assert_eq!(kind.to_string(), "Powergate error: cid not found");
    }
}
