//! Bearer authentication extractor.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;
use tracing::Span;

use emporium_core::UserId;

use crate::error::{AppError, set_sentry_user};
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// Rejects with 401 and a JSON `{message}` when the header is missing or the
/// token is malformed, forged or expired.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(owner): RequireAuth) -> impl IntoResponse {
///     format!("Hello, user {owner}!")
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireAuth(pub UserId);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let owner = state
            .tokens()
            .verify(token, Utc::now())
            .inspect_err(|e| tracing::debug!(error = %e, "rejected bearer token"))?;

        Span::current().record("user_id", owner.as_i32());
        set_sentry_user(&owner);

        Ok(Self(owner))
    }
}
