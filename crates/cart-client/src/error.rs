//! Client error types.

use std::time::Duration;

use thiserror::Error;

use crate::action::ActionKey;

/// Errors surfaced by the cart client.
///
/// `Clone` so the controller can keep the last one in its error slot while
/// also returning it to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// No identity; nothing was attempted.
    #[error("must be signed in")]
    Unauthenticated,

    /// The server rejected the bearer token.
    #[error("{0}")]
    Unauthorized(String),

    /// The request exceeded its bound and was aborted.
    #[error("Request timeout")]
    Timeout(Duration),

    /// The request was aborted because the identity changed.
    #[error("request cancelled")]
    Cancelled,

    /// Network failure before a response arrived.
    #[error("network error: {0}")]
    Transport(String),

    /// The cart or item does not exist server-side.
    #[error("{0}")]
    NotFound(String),

    /// The request is not valid for the cart's current state (e.g. empty cart at checkout).
    #[error("{0}")]
    InvalidState(String),

    /// Any other non-success status.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// The response body was not what the API promises.
    #[error("invalid response: {0}")]
    Decode(String),

    /// Quantities cannot be negative.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// The same action is already in flight.
    #[error("{0} is already in progress")]
    ActionPending(ActionKey),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl ClientError {
    /// Map a non-success response to an error, using the body's `message`
    /// when there is one.
    #[must_use]
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        let message = message.unwrap_or_else(|| format!("HTTP error! status: {status}"));
        match status {
            401 => Self::Unauthorized(message),
            404 => Self::NotFound(message),
            400 | 422 => Self::InvalidState(message),
            _ => Self::Server { status, message },
        }
    }
}
