//! Error types for the Formstack API client.
//!
//! # Design
//! Caller mistakes (`InvalidArgument`) are raised while a request is being
//! built, so they never reach the transport. Everything else describes what
//! happened on the wire: a non-2xx status in strict mode, a transport that
//! never produced a status, or a body that is not the JSON we expected.

use thiserror::Error;

/// Errors returned by `FormstackClient` and `FormstackApi`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed, missing or mismatched caller input. No request was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The server answered outside [200, 300) while the client is strict.
    #[error("Request failed. Exception code contains HTTP Status. (HTTP {status})")]
    RequestFailed { status: u16, body: String },

    /// No HTTP status was obtained (connect, DNS, TLS or I/O failure).
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The service reported a failure in its JSON body.
    #[error("service error ({status}): {error}")]
    Service { status: String, error: String },
}

impl ApiError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ApiError::InvalidArgument(msg.into())
    }

    /// HTTP status attached to the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}
