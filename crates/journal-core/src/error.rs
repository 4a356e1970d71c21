//! Client-level error types.

use thiserror::Error;

/// Errors surfaced by the client core to its views.
///
/// None of these are fatal: every component stays usable after returning
/// one of them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The action needs a resolved profile and there is none.
    #[error("You must be signed in to do that")]
    Unauthenticated,

    /// A request for the same key is already in flight.
    #[error("Request already in progress")]
    Busy,

    /// Uniqueness violation, e.g. username taken.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The call failed; the user may trigger it again.
    #[error("Network error: {0}")]
    TransientNetwork(String),

    /// A result arrived for a superseded epoch and was dropped.
    #[error("Stale result for epoch {epoch} (current {current})")]
    Stale { epoch: u64, current: u64 },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid state: {0}")]
    InvalidState(&'static str),
}

/// Errors returned by backend ports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Resource not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Request failed: {0}")]
    Network(String),

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl From<ApiError> for ClientError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Conflict(msg) => ClientError::Conflict(msg),
            other => ClientError::TransientNetwork(other.to_string()),
        }
    }
}
