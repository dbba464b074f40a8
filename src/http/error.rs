//! Turning failed requests into responses.
//!
//! Only failures the workflows could not absorb get here: anything reportable
//! has already been written to the event log and shown to the user as a
//! notice on an ordinary page.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ffsgate_store::error::Error as StoreError;
use ffsgate_workflow::error::{Error as WorkflowError, ErrorKind as WorkflowErrorKind};

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    pub(crate) fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub(crate) fn bad_request(err: impl std::fmt::Display) -> Self {
        Self::new(StatusCode::BAD_REQUEST, err.to_string())
    }
}

impl From<WorkflowError> for HttpError {
    fn from(err: WorkflowError) -> Self {
        let status = match &*err {
            WorkflowErrorKind::NotFound(_) => StatusCode::NOT_FOUND,
            WorkflowErrorKind::NoFileProvided | WorkflowErrorKind::PackageNameMissing => StatusCode::BAD_REQUEST,
            WorkflowErrorKind::Backend(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        match status.is_server_error() {
            true => tracing::error!(error = ?err, "request failed"),
            false => tracing::debug!(error = %*err, "request rejected"),
        }
        let message = match status {
            StatusCode::INTERNAL_SERVER_ERROR => "Something went wrong on our side.".to_string(),
            _ => (*err).to_string(),
        };
        Self::new(status, message)
    }
}

impl From<StoreError> for HttpError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = ?err, "store failure");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong on our side.")
    }
}

impl From<crate::error::Error> for HttpError {
    fn from(err: crate::error::Error) -> Self {
        tracing::error!(error = ?err, "could not render page");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong on our side.")
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let reason = self.status.canonical_reason().unwrap_or("Error");
        (self.status, format!("{} {reason}\n\n{}\n", self.status.as_u16(), self.message)).into_response()
    }
}
