//! Bearer token issuance.
//!
//! Tokens are signed with `STOREFRONT_AUTH_SECRET`, so they are only valid
//! against a storefront configured with the same secret.

use chrono::Utc;
use thiserror::Error;

use emporium_core::UserId;
use emporium_storefront::config::{AuthConfig, ConfigError};
use emporium_storefront::services::auth::{AuthError, TokenSigner};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to sign token: {0}")]
    Sign(#[from] AuthError),
}

/// Issue a token for `user` and print it.
///
/// # Errors
///
/// Returns `TokenError` if the auth secret is missing or weak.
pub fn issue(user: i32) -> Result<(), TokenError> {
    dotenvy::dotenv().ok();

    let config = AuthConfig::from_env()?;
    let signer = TokenSigner::from_config(&config);
    let token = signer.issue(UserId::new(user), Utc::now())?;

    tracing::info!(user_id = user, ttl_hours = config.token_ttl.num_hours(), "Token issued");

    #[allow(clippy::print_stdout)]
    {
        println!("{token}");
    }
    Ok(())
}
