//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Every error response is a JSON [`ErrorBody`] so clients can show `message`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use emporium_core::CartError;
use emporium_core::api::{ErrorBody, ValidationError};

use crate::services::auth::AuthError;
use crate::store::StoreError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Store operation failed, or rejected the mutation.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Bearer token check failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Request body failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Store(StoreError::Cart(err)) => match err {
                CartError::CartNotFound | CartError::ItemNotFound(_) => StatusCode::NOT_FOUND,
                CartError::EmptyCart
                | CartError::ZeroQuantity
                | CartError::QuantityOverflow(_)
                | CartError::TotalOverflow => StatusCode::BAD_REQUEST,
            },
            Self::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Store(err) if err.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    const fn is_server_fault(&self) -> bool {
        matches!(
            self,
            Self::Store(
                StoreError::Database(_) | StoreError::DataCorruption(_) | StoreError::Conflict(_)
            )
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_fault() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Store(StoreError::Cart(err)) => err.to_string(),
            Self::Store(StoreError::Conflict(_)) => "Please try again".to_string(),
            Self::Store(_) if status == StatusCode::SERVICE_UNAVAILABLE => {
                "Service temporarily unavailable".to_string()
            }
            Self::Store(_) => "Internal server error".to_string(),
            Self::Auth(AuthError::MissingToken) => "Authentication required".to_string(),
            Self::Auth(AuthError::Expired) => "Session expired, please sign in again".to_string(),
            Self::Auth(_) => "Invalid credentials".to_string(),
            Self::Validation(err) => err.to_string(),
            Self::NotFound(msg) | Self::BadRequest(msg) => msg.clone(),
        };

        (status, Json(ErrorBody { message })).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}
