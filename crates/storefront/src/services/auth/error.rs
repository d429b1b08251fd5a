//! Authentication error types.

use thiserror::Error;

/// Errors that can occur while checking a bearer token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization: Bearer` header.
    #[error("missing bearer token")]
    MissingToken,

    /// Token is not `<user_id>.<expires>.<signature>`.
    #[error("malformed token")]
    Malformed,

    /// Signature does not match the payload.
    #[error("invalid token signature")]
    InvalidSignature,

    /// Token is past its expiry.
    #[error("token expired")]
    Expired,

    /// The signing key was rejected by HMAC.
    #[error("invalid signing key")]
    InvalidKey,
}
