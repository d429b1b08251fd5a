//! Cart client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `CART_API_URL` - Base URL of the cart API (default: `http://localhost:5000/api`)
//! - `CART_REQUEST_TIMEOUT_MS` - Per-request bound in milliseconds (default: 10000)

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default request bound.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(10_000);

const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Where the cart API lives and how long to wait for it.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL; paths like `cart/add` are joined onto it.
    pub api_url: Url,
    /// Bound applied to every request.
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Build a config for an explicit base URL with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL does not parse.
    pub fn new(api_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: parse_base_url(api_url)?,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = std::env::var("CART_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let request_timeout = match std::env::var("CART_REQUEST_TIMEOUT_MS") {
            Ok(value) => value
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .ok_or_else(|| {
                    ConfigError::InvalidEnvVar(
                        "CART_REQUEST_TIMEOUT_MS".to_string(),
                        "must be a positive number of milliseconds".to_string(),
                    )
                })?,
            Err(_) => DEFAULT_REQUEST_TIMEOUT,
        };

        Ok(Self {
            api_url: parse_base_url(&api_url)?,
            request_timeout,
        })
    }
}

/// Parse a base URL, making sure it ends in `/` so relative joins keep its path.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar("CART_API_URL".to_string(), e.to_string()))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
