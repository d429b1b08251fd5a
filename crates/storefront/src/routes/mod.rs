//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness
//! GET  /health/ready                - Readiness (store ping)
//!
//! # Cart (requires bearer auth, returns the cart snapshot)
//! GET    /api/cart                  - Fetch, creating an empty cart on first access
//! POST   /api/cart/add              - Increment-or-append a line
//! PUT    /api/cart/update/{id}      - Overwrite quantity (0 removes)
//! DELETE /api/cart/remove/{id}      - Remove a line (idempotent)
//! DELETE /api/cart/clear            - Empty the cart
//!
//! # Orders (requires bearer auth)
//! POST /api/orders/create           - Cart -> pending order, cart emptied (201)
//! GET  /api/orders                  - Order history, newest first
//! GET  /api/orders/{id}             - One order
//! ```

pub mod cart;
pub mod health;
pub mod orders;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update/{product_id}", put(cart::update))
        .route("/remove/{product_id}", delete(cart::remove))
        .route("/clear", delete(cart::clear))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/create", post(orders::create))
        .route("/{id}", get(orders::show))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/cart", cart_routes())
        .nest("/api/orders", order_routes())
}
