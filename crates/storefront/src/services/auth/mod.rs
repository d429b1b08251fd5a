//! Bearer token authentication.
//!
//! Session issuance is an external concern; this module only signs and checks
//! the compact tokens the API accepts:
//!
//! ```text
//! <user_id>.<expires_unix>.<hex hmac-sha256>
//! ```
//!
//! The MAC covers `v1:<user_id>.<expires_unix>`.

mod error;

pub use error::AuthError;

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use emporium_core::UserId;

use crate::config::AuthConfig;

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies bearer tokens with a shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    secret: SecretString,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenSigner {
    #[must_use]
    pub const fn new(secret: SecretString, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.secret.clone(), config.token_ttl)
    }

    fn mac(&self, payload: &str) -> Result<HmacSha256, AuthError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| AuthError::InvalidKey)?;
        mac.update(b"v1:");
        mac.update(payload.as_bytes());
        Ok(mac)
    }

    /// Issue a token for `user` that expires `ttl` after `now`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidKey` if HMAC rejects the secret.
    pub fn issue(&self, user: UserId, now: DateTime<Utc>) -> Result<String, AuthError> {
        let expires = (now + self.ttl).timestamp();
        let payload = format!("{user}.{expires}");
        let signature = hex::encode(self.mac(&payload)?.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    /// Check a token and return the user it was issued to.
    ///
    /// # Errors
    ///
    /// Returns `Malformed`, `InvalidSignature` or `Expired`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, AuthError> {
        let (payload, signature) = token.rsplit_once('.').ok_or(AuthError::Malformed)?;
        let (user, expires) = payload.split_once('.').ok_or(AuthError::Malformed)?;

        let user: UserId = user.parse().map_err(|_| AuthError::Malformed)?;
        let expires: i64 = expires.parse().map_err(|_| AuthError::Malformed)?;
        let signature = hex::decode(signature).map_err(|_| AuthError::Malformed)?;

        // Constant-time comparison
        self.mac(payload)?
            .verify_slice(&signature)
            .map_err(|_| AuthError::InvalidSignature)?;

        if now.timestamp() >= expires {
            return Err(AuthError::Expired);
        }

        Ok(user)
    }
}
