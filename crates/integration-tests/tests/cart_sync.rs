//! End-to-end cart synchronization: controller -> HTTP -> storefront -> store.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use emporium_cart_client::{ActionKey, ClientError};
use emporium_core::ProductId;
use emporium_integration_tests::{TestContext, address, product};
use rust_decimal::Decimal;

const A: ProductId = ProductId::new(1);
const B: ProductId = ProductId::new(2);

#[tokio::test]
async fn test_initial_fetch_creates_empty_cart() {
    let ctx = TestContext::start().await;
    let controller = ctx.controller(1).await;

    let cart = controller.cart().expect("cart fetched on sign-in");
    assert!(cart.is_empty());
    assert_eq!(cart.total_price, Decimal::ZERO);
    assert!(controller.summary().is_empty);
    assert!(!controller.view().loading);
}

#[tokio::test]
async fn test_adding_twice_merges_lines() {
    let ctx = TestContext::start().await;
    let controller = ctx.controller(1).await;

    controller.add_to_cart(product(1, "12.50"), 1).await.unwrap();
    let cart = controller.add_to_cart(product(1, "12.50"), 2).await.unwrap();

    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.line(A).unwrap().quantity, 3);
    assert_eq!(cart.total_price, Decimal::new(3750, 2));

    let summary = controller.summary();
    assert_eq!(summary.item_count, 3);
    assert_eq!(summary.subtotal, Decimal::new(3750, 2));
}

#[tokio::test]
async fn test_update_and_remove() {
    let ctx = TestContext::start().await;
    let controller = ctx.controller(1).await;
    controller.add_to_cart(product(1, "10.00"), 1).await.unwrap();
    controller.add_to_cart(product(2, "4.25"), 2).await.unwrap();

    let cart = controller.update_quantity(A, 4).await.unwrap();
    assert_eq!(cart.line(A).unwrap().quantity, 4);
    assert_eq!(cart.total_price, Decimal::new(4850, 2));

    let cart = controller.update_quantity(A, 0).await.unwrap();
    assert!(cart.line(A).is_none());

    let cart = controller.remove_from_cart(B).await.unwrap();
    assert!(cart.is_empty());
    assert_eq!(cart.total_price, Decimal::ZERO);
}

#[tokio::test]
async fn test_removing_absent_item_is_noop() {
    let ctx = TestContext::start().await;
    let controller = ctx.controller(1).await;
    controller.add_to_cart(product(1, "10.00"), 1).await.unwrap();

    let cart = controller.remove_from_cart(B).await.unwrap();

    assert_eq!(cart.items.len(), 1);
    assert_eq!(controller.last_error(), None);
}

#[tokio::test]
async fn test_update_unknown_item_rolls_back() {
    let ctx = TestContext::start().await;
    let controller = ctx.controller(1).await;
    controller.add_to_cart(product(1, "10.00"), 2).await.unwrap();

    let err = controller.update_quantity(B, 3).await.unwrap_err();

    assert_eq!(err, ClientError::NotFound("Item not found in cart".to_string()));
    assert_eq!(controller.last_error(), Some(err));
    assert_eq!(controller.summary().item_count, 2);
    assert!(!controller.is_action_pending(ActionKey::Update(B)));
}

#[tokio::test]
async fn test_clear_cart() {
    let ctx = TestContext::start().await;
    let controller = ctx.controller(1).await;
    controller.add_to_cart(product(1, "10.00"), 2).await.unwrap();

    let cart = controller.clear_cart().await.unwrap();

    assert!(cart.is_empty());
    assert!(controller.summary().is_empty);
}

#[tokio::test]
async fn test_carts_are_per_user() {
    let ctx = TestContext::start().await;
    let alice = ctx.controller(1).await;
    let bob = ctx.controller(2).await;

    alice.add_to_cart(product(1, "10.00"), 1).await.unwrap();
    let bobs = bob.fetch_cart().await.unwrap();

    assert!(bobs.is_empty());
}

#[tokio::test]
async fn test_other_session_changes_win_on_next_response() {
    let ctx = TestContext::start().await;
    let laptop = ctx.controller(1).await;
    let phone = ctx.controller(1).await;

    laptop.add_to_cart(product(1, "10.00"), 1).await.unwrap();
    let cart = phone.add_to_cart(product(2, "5.00"), 1).await.unwrap();

    // The phone's snapshot carries the laptop's line too.
    assert_eq!(cart.items.len(), 2);
    assert_eq!(phone.summary().item_count, 2);
}

#[tokio::test]
async fn test_place_order() {
    let ctx = TestContext::start().await;
    let controller = ctx.controller(1).await;
    controller.add_to_cart(product(1, "10.00"), 2).await.unwrap();
    controller.add_to_cart(product(2, "4.25"), 1).await.unwrap();

    let order = controller.place_order(address()).await.unwrap();

    assert_eq!(order.items.len(), 2);
    assert_eq!(order.total_price, Decimal::new(2425, 2));
    assert_eq!(order.status.to_string(), "pending");
    assert!(order.order_number.as_str().starts_with("ORD"));
    assert_eq!(order.shipping_address, address());

    // The cart was emptied server-side and re-fetched.
    assert!(controller.summary().is_empty);
    assert!(controller.cart().unwrap().is_empty());

    let orders = controller.orders().await.unwrap();
    assert_eq!(orders, vec![order]);
}

#[tokio::test]
async fn test_order_snapshot_survives_later_cart_changes() {
    let ctx = TestContext::start().await;
    let controller = ctx.controller(1).await;
    controller.add_to_cart(product(1, "10.00"), 1).await.unwrap();
    let first = controller.place_order(address()).await.unwrap();

    controller.add_to_cart(product(1, "10.00"), 5).await.unwrap();
    let second = controller.place_order(address()).await.unwrap();

    assert_ne!(first.order_number, second.order_number);
    assert_eq!(first.items[0].quantity, 1);
    assert_eq!(second.items[0].quantity, 5);

    let orders = controller.orders().await.unwrap();
    assert_eq!(orders, vec![second, first]);
}

#[tokio::test]
async fn test_order_on_empty_cart() {
    let ctx = TestContext::start().await;
    let controller = ctx.controller(1).await;

    let err = controller.place_order(address()).await.unwrap_err();

    assert_eq!(err, ClientError::InvalidState("Cart is empty".to_string()));
    assert_eq!(controller.last_error(), Some(err));
}
