//! Emporium Storefront library.
//!
//! The Cart Service and its server-of-record, exposed over HTTP. Built as a
//! library so the binary, the CLI and the integration tests share one router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

use std::time::Duration;

use axum::Router;
use axum::http::{Request, Response};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::state::AppState;

/// Build the complete router with tracing and request IDs.
///
/// Sentry and CORS layers are added by the binary, since they depend on
/// process-level configuration.
pub fn app(state: AppState) -> Router {
    routes::routes()
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, StatusCode, header};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use secrecy::SecretString;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use emporium_core::api::ErrorBody;
    use emporium_core::{Cart, Order, UserId};

    use super::*;
    use crate::services::auth::TokenSigner;
    use crate::store::MemoryCartStore;

    fn signer() -> TokenSigner {
        TokenSigner::new(
            SecretString::from("pQ7&rT0*uW4^zC6aB3$xY9!mKk2@nL5#"),
            chrono::Duration::hours(1),
        )
    }

    fn router() -> Router {
        app(AppState::new(Arc::new(MemoryCartStore::new()), signer()))
    }

    fn token(user: i32) -> String {
        signer().issue(UserId::new(user), Utc::now()).unwrap()
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        user: Option<i32>,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token(user)));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    fn mug(quantity: u32) -> Value {
        json!({
            "productId": 1,
            "title": "Mug",
            "price": "12.50",
            "image": "https://cdn.example.com/mug.jpg",
            "quantity": quantity,
        })
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let app = router();
        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ok");

        let (status, _) = send(&app, Method::GET, "/health/ready", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cart_requires_token() {
        let (status, body) = send(&router(), Method::GET, "/api/cart", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let body: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.message, "Authentication required");
    }

    #[tokio::test]
    async fn test_get_creates_empty_cart() {
        let (status, body) = send(&router(), Method::GET, "/api/cart", Some(5), None).await;
        assert_eq!(status, StatusCode::OK);

        let cart: Cart = serde_json::from_slice(&body).unwrap();
        assert_eq!(cart.owner_id, UserId::new(5));
        assert!(cart.items.is_empty());
    }

    #[tokio::test]
    async fn test_add_update_remove_flow() {
        let app = router();

        send(&app, Method::POST, "/api/cart/add", Some(1), Some(mug(1))).await;
        let (status, body) =
            send(&app, Method::POST, "/api/cart/add", Some(1), Some(mug(2))).await;
        assert_eq!(status, StatusCode::OK);
        let cart: Cart = serde_json::from_slice(&body).unwrap();
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.total_price, Decimal::new(3750, 2));

        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/cart/update/1",
            Some(1),
            Some(json!({ "quantity": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let cart: Cart = serde_json::from_slice(&body).unwrap();
        assert!(cart.items.is_empty());

        let (status, _) = send(&app, Method::DELETE, "/api/cart/remove/99", Some(1), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_update_unknown_item_is_not_found() {
        let app = router();
        send(&app, Method::POST, "/api/cart/add", Some(1), Some(mug(1))).await;

        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/cart/update/2",
            Some(1),
            Some(json!({ "quantity": 4 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let body: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.message, "Item not found in cart");
    }

    #[tokio::test]
    async fn test_clear_without_cart_is_not_found() {
        let (status, body) =
            send(&router(), Method::DELETE, "/api/cart/clear", Some(1), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let body: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.message, "Cart not found");
    }

    #[tokio::test]
    async fn test_malformed_bodies_are_bad_requests() {
        let app = router();

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/cart/add",
            Some(1),
            Some(json!({ "productId": "one" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let mut zero = mug(0);
        zero["quantity"] = json!(0);
        let (status, _) = send(&app, Method::POST, "/api/cart/add", Some(1), Some(zero)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            Method::PUT,
            "/api/cart/update/not-a-number",
            Some(1),
            Some(json!({ "quantity": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_order_lifecycle() {
        let app = router();
        let address = json!({
            "shippingAddress": {
                "street": "1 Main St",
                "city": "Springfield",
                "state": "IL",
                "zipCode": "62701",
                "country": "US",
            }
        });

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/orders/create",
            Some(1),
            Some(address.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        send(&app, Method::POST, "/api/cart/add", Some(1), Some(mug(2))).await;
        let (status, body) =
            send(&app, Method::POST, "/api/orders/create", Some(1), Some(address)).await;
        assert_eq!(status, StatusCode::CREATED);
        let order: Order = serde_json::from_slice(&body).unwrap();
        assert_eq!(order.total_price, Decimal::new(2500, 2));

        let (_, body) = send(&app, Method::GET, "/api/cart", Some(1), None).await;
        let cart: Cart = serde_json::from_slice(&body).unwrap();
        assert!(cart.items.is_empty());

        let (_, body) = send(&app, Method::GET, "/api/orders", Some(1), None).await;
        let orders: Vec<Order> = serde_json::from_slice(&body).unwrap();
        assert_eq!(orders, vec![order.clone()]);

        let uri = format!("/api/orders/{}", order.id);
        let (status, _) = send(&app, Method::GET, &uri, Some(1), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, Method::GET, &uri, Some(2), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_incomplete_address_is_rejected() {
        let app = router();
        send(&app, Method::POST, "/api/cart/add", Some(1), Some(mug(1))).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/orders/create",
            Some(1),
            Some(json!({ "shippingAddress": { "street": "1 Main St" } })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert!(body.message.starts_with("shipping address is missing"));
    }
}
