//! Integration tests for Emporium.
//!
//! Each test boots the storefront router in-process on an ephemeral port,
//! backed by the in-memory store, and talks to it over real HTTP.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p emporium-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::expect_used, clippy::missing_panics_doc)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use secrecy::SecretString;

use emporium_cart_client::{CartController, ClientConfig, HttpCartApi, Identity};
use emporium_core::{ProductId, ProductSnapshot, ShippingAddress, UserId};
use emporium_storefront::services::auth::TokenSigner;
use emporium_storefront::state::AppState;
use emporium_storefront::store::MemoryCartStore;

const TEST_SECRET: &str = "integration-secret-9f8e7d6c5b4a3928171605f4e3d2c1b0";

/// A running storefront and the means to talk to it.
pub struct TestContext {
    pub addr: SocketAddr,
    pub tokens: TokenSigner,
    pub http: reqwest::Client,
}

impl TestContext {
    /// Start a storefront with an empty in-memory store.
    pub async fn start() -> Self {
        let tokens = TokenSigner::new(SecretString::from(TEST_SECRET), chrono::Duration::hours(1));
        let state = AppState::new(Arc::new(MemoryCartStore::new()), tokens.clone());
        let app = emporium_storefront::app(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server error");
        });

        Self {
            addr,
            tokens,
            http: reqwest::Client::new(),
        }
    }

    /// Base URL of the cart API.
    pub fn api_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// A valid bearer token for `user`.
    pub fn token(&self, user: i32) -> String {
        self.tokens
            .issue(UserId::new(user), Utc::now())
            .expect("Failed to issue token")
    }

    /// A controller signed in as `user`, with its initial fetch done.
    pub async fn controller(&self, user: i32) -> CartController {
        let controller = self.signed_out_controller();
        controller
            .set_identity(Some(Identity::new(
                UserId::new(user),
                SecretString::from(self.token(user)),
            )))
            .await
            .expect("Initial cart fetch failed");
        controller
    }

    /// A controller pointed at this server with nobody signed in.
    pub fn signed_out_controller(&self) -> CartController {
        let config = ClientConfig::new(&self.api_url()).expect("Invalid test URL");
        CartController::new(Arc::new(HttpCartApi::new(&config)), config.request_timeout)
    }
}

/// A controller whose requests go to `addr` with a short bound.
pub fn controller_for(addr: SocketAddr, timeout: Duration) -> CartController {
    let mut config = ClientConfig::new(&format!("http://{addr}/api")).expect("Invalid test URL");
    config.request_timeout = timeout;
    CartController::new(Arc::new(HttpCartApi::new(&config)), config.request_timeout)
}

pub fn product(id: i32, price: &str) -> ProductSnapshot {
    ProductSnapshot {
        product_id: ProductId::new(id),
        title: format!("Product {id}"),
        unit_price: price.parse::<Decimal>().expect("Invalid test price"),
        image: format!("https://cdn.example.com/products/{id}.jpg"),
    }
}

pub fn address() -> ShippingAddress {
    ShippingAddress {
        street: "221B Baker Street".to_string(),
        city: "London".to_string(),
        state: "Greater London".to_string(),
        zip_code: "NW1 6XE".to_string(),
        country: "UK".to_string(),
    }
}
