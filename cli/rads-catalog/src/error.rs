//! Error handling for registry dispatch operations.

use reqwest::StatusCode;
use thiserror::Error;

pub use crate::types::MalformedResponse;

/// Message shown when the server rejects a request without explaining why.
pub const GENERIC_FAILURE_MESSAGE: &str = "API request failed";

/// Common error type for dispatch operations.
///
/// Operation specific errors ([LookupError], SDK errors) wrap this type.
#[derive(Debug, Error)]
pub enum CatalogClientError {
    /// The request never produced a response (DNS, connection, timeout).
    #[error("could not reach the registry: {0}")]
    Transport(#[source] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("{status}: {message}")]
    Rejection { status: StatusCode, message: String },
    #[error("unexpected response from the registry: {0}")]
    MalformedResponse(#[from] MalformedResponse),
    #[error("{0}")]
    Other(String),
}

impl CatalogClientError {
    /// The message to present to a user for a failed remote call.
    ///
    /// Prefers what the server said, falls back to a generic message.
    pub fn user_message(&self) -> String {
        match self {
            CatalogClientError::Rejection { message, .. } => message.clone(),
            CatalogClientError::Transport(_)
            | CatalogClientError::MalformedResponse(_)
            | CatalogClientError::Other(_) => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl From<reqwest::Error> for CatalogClientError {
    fn from(err: reqwest::Error) -> Self {
        CatalogClientError::Transport(err)
    }
}

/// Error returned by single package lookups.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("package '{0}' not found")]
    NotFound(String),
    #[error(transparent)]
    Catalog(#[from] CatalogClientError),
}

/// Extract the server provided message from an error body.
///
/// The registry reports failures as `{ "error": "<message>" }`.
pub(crate) fn rejection_message(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .as_ref()
        .and_then(|value| value.get("error"))
        .and_then(|error| error.as_str())
        .filter(|message| !message.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string())
}
