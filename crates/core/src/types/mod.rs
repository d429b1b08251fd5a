//! Domain types for the storefront.
//!
//! This module provides type-safe IDs, decimal money helpers, the cart entity
//! with its mutation arithmetic, and orders.

pub mod cart;
pub mod id;
pub mod money;
pub mod order;

pub use cart::{Cart, CartError, CartItem, CartMutation, ProductSnapshot};
pub use id::*;
pub use money::{CheckoutTotals, MAX_UNIT_PRICE, TAX_RATE, round_cents};
pub use order::{Order, OrderNumber, OrderStatus, ShippingAddress};
