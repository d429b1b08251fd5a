//! Application state shared across handlers.

use std::sync::Arc;

use crate::services::CartService;
use crate::services::auth::TokenSigner;
use crate::store::CartStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    carts: CartService,
    tokens: TokenSigner,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `store` - Server-of-record for carts and orders
    /// * `tokens` - Bearer token verifier
    #[must_use]
    pub fn new(store: Arc<dyn CartStore>, tokens: TokenSigner) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                carts: CartService::new(store),
                tokens,
            }),
        }
    }

    /// Get a reference to the cart service.
    #[must_use]
    pub fn carts(&self) -> &CartService {
        &self.inner.carts
    }

    /// Get a reference to the bearer token signer.
    #[must_use]
    pub fn tokens(&self) -> &TokenSigner {
        &self.inner.tokens
    }
}
