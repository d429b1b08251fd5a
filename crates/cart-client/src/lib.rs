//! Emporium cart client.
//!
//! A client-resident controller that keeps a shadow copy of the user's cart
//! in step with the server of record:
//!
//! - intents are applied optimistically and published immediately
//! - every request is bounded by a timeout and a cancellation token
//! - server snapshots win on success; failures roll back and re-fetch
//! - consumers observe state through a [`tokio::sync::watch`] channel
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use emporium_cart_client::{CartController, ClientConfig, HttpCartApi, Identity};
//!
//! let config = ClientConfig::from_env()?;
//! let api = Arc::new(HttpCartApi::new(&config));
//! let cart = CartController::new(api, config.request_timeout);
//!
//! cart.set_identity(Some(Identity::new(user_id, token))).await?;
//! cart.add_to_cart(product, 2).await?;
//! println!("{} items", cart.summary().item_count);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod action;
pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod summary;

pub use action::ActionKey;
pub use api::{CartApi, HttpCartApi};
pub use config::ClientConfig;
pub use controller::{CartController, CartView, Identity};
pub use error::ClientError;
pub use summary::CartSummary;
