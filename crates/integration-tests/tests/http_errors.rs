//! Failure paths over real HTTP: auth, malformed payloads, timeouts.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use reqwest::StatusCode;
use secrecy::SecretString;
use serde_json::{Value, json};

use emporium_cart_client::{ClientError, Identity};
use emporium_core::UserId;
use emporium_integration_tests::{TestContext, controller_for, product};

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::start().await;

    let resp = ctx
        .http
        .get(format!("http://{}/health", ctx.addr))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let ctx = TestContext::start().await;

    let resp = ctx
        .http
        .get(format!("{}/cart", ctx.api_url()))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Authentication required");
}

#[tokio::test]
async fn test_bad_token_surfaces_as_unauthorized() {
    let ctx = TestContext::start().await;
    let controller = ctx.signed_out_controller();

    let err = controller
        .set_identity(Some(Identity::new(
            UserId::new(1),
            SecretString::from("1.9999999999.deadbeef"),
        )))
        .await
        .unwrap_err();

    assert_eq!(err, ClientError::Unauthorized("Invalid credentials".to_string()));
    assert_eq!(controller.last_error(), Some(err));
}

#[tokio::test]
async fn test_signed_out_controller_sends_nothing() {
    let ctx = TestContext::start().await;
    let controller = ctx.signed_out_controller();

    let err = controller.add_to_cart(product(1, "1.00"), 1).await.unwrap_err();

    assert_eq!(err, ClientError::Unauthenticated);
}

#[tokio::test]
async fn test_malformed_add_payload() {
    let ctx = TestContext::start().await;

    let resp = ctx
        .http
        .post(format!("{}/cart/add", ctx.api_url()))
        .bearer_auth(ctx.token(1))
        .json(&json!({ "productId": 1, "quantity": 1 }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_incomplete_address() {
    let ctx = TestContext::start().await;
    let controller = ctx.controller(1).await;
    controller.add_to_cart(product(1, "3.00"), 1).await.unwrap();

    let resp = ctx
        .http
        .post(format!("{}/orders/create", ctx.api_url()))
        .bearer_auth(ctx.token(1))
        .json(&json!({ "shippingAddress": { "street": "1 Main St" } }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Nothing was ordered; the cart is intact.
    let cart = controller.fetch_cart().await.unwrap();
    assert_eq!(cart.item_count(), 1);
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let ctx = TestContext::start().await;

    let resp = ctx
        .http
        .get(format!("{}/orders/999", ctx.api_url()))
        .bearer_auth(ctx.token(1))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unresponsive_server_times_out() {
    // Accepts connections (via the backlog) but never answers.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let timeout = Duration::from_millis(200);
    let controller = controller_for(addr, timeout);

    let err = controller
        .set_identity(Some(Identity::new(UserId::new(1), SecretString::from("t"))))
        .await
        .unwrap_err();

    assert_eq!(err, ClientError::Timeout(timeout));
    assert_eq!(err.to_string(), "Request timeout");
    assert!(!controller.view().loading);
    drop(listener);
}
