//! Workflow Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.
//!
//! Most remote and file system failures never leave this crate as errors:
//! the workflows catch them, write an event, and report them as a failed
//! outcome. What does come out of here is either a user mistake the caller
//! should reprompt for, a lookup miss, or something the caller cannot fix.

use derive_more::{Display, Error};
use ffsgate_powergate::error::Error as PowergateError;
use ffsgate_store::error::{Error as StoreError, ErrorKind as StoreErrorKind};

/// A workflow error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for workflow operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// ### User Errors
/// - [`ErrorKind::NoFileProvided`]
/// - [`ErrorKind::PackageNameMissing`]
/// - [`ErrorKind::NotFound`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Backend`] - caught inside every workflow that talks to
///   the service; only escapes from
///   [`ensure_default`](crate::ensure_default).
/// - [`ErrorKind::Io`] - same as above.
/// - [`ErrorKind::Duplicate`] - same as above.
/// - [`ErrorKind::Store`] - always escapes.
/// - [`ErrorKind::Integrity`] - always escapes.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("Please choose a file to upload to Filecoin")]
    NoFileProvided,
    #[display("Please enter a name for the package")]
    PackageNameMissing,
    /// No FFS with this identifier is known locally.
    #[display("FFS {_0} not found")]
    NotFound(#[error(not(source))] String),
    /// The storage service failed; carries its description.
    #[display("{_0}")]
    Backend(#[error(not(source))] String),
    /// Local file handling failed; carries its description.
    #[display("{_0}")]
    Io(#[error(not(source))] String),
    /// The content was uploaded before and is already recorded.
    #[display("a file with CID {_0} has already been uploaded")]
    Duplicate(#[error(not(source))] String),
    #[display("store error")]
    Store,
    /// Local records contradict what the storage service reports.
    #[display("integrity error: {_0}")]
    Integrity(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend(_))
    }

    /// Returns `true` if the user should be asked to correct their request.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::NoFileProvided | Self::PackageNameMissing)
    }

    /// Wrap a storage service error, keeping its frame as a child in the
    /// error tree and its description in ours.
    #[track_caller]
    pub(crate) fn backend(err: PowergateError) -> Error {
        let detail = (*err).to_string();
        err.raise(ErrorKind::Backend(detail))
    }

    #[track_caller]
    pub(crate) fn io(err: std::io::Error) -> Error {
        let detail = err.to_string();
        exn::Exn::from(err).raise(ErrorKind::Io(detail))
    }

    /// Wrap a store error, singling out the one store failure that is the
    /// user's concern rather than ours.
    #[track_caller]
    pub(crate) fn store(err: StoreError) -> Error {
        let kind = match &*err {
            StoreErrorKind::DuplicateCid(cid) => ErrorKind::Duplicate(cid.clone()),
            _ => ErrorKind::Store,
        };
        err.raise(kind)
    }

    /// Whether a failure inside a workflow should be reported as a failed
    /// outcome instead of being propagated.
    pub(crate) fn is_reportable(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::Io(_) | Self::Duplicate(_))
    }
}
