//! Error types for the API client.
//!
//! # Design
//! Every non-2xx response becomes `RequestFailed`, whose display form is
//! `<status>: <text>`. Transport and JSON failures are wrapped without
//! rewording so callers see the underlying message.

use thiserror::Error;

/// Errors returned by `ApiClient` and `QueryClient`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a status outside 200..=299.
    ///
    /// `text` is the response body, or the reason phrase when the body was
    /// empty.
    #[error("{status}: {text}")]
    RequestFailed { status: u16, text: String },

    /// The request never produced a response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A payload could not be serialized, or a body could not be parsed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A query key had no path element.
    #[error("query key is empty")]
    EmptyQueryKey,
}

impl ApiError {
    /// Status code carried by `RequestFailed`.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure to complete an HTTP round-trip.
#[derive(Debug, Error)]
#[error("transport error: {message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(feature = "ureq")]
impl From<ureq::Error> for TransportError {
    fn from(err: ureq::Error) -> Self {
        TransportError::new(err.to_string())
    }
}
