//! Cart store: the durable server-of-record for carts and orders.
//!
//! Every operation is a transaction scoped to a single owner. Operations on
//! different owners never wait on each other.
//!
//! # Implementations
//!
//! - [`crate::db::PgCartStore`] - `PostgreSQL` (production)
//! - [`MemoryCartStore`] - process memory (local development, tests)

mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use emporium_core::{
    Cart, CartError, CartMutation, Order, OrderId, OrderNumber, ShippingAddress, UserId,
};

pub use memory::MemoryCartStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The mutation itself was rejected; nothing was written.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Constraint violation (e.g., duplicate order number).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl StoreError {
    /// Whether the store could not be reached at all.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Database(
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            )
        )
    }
}

/// Everything needed to turn a cart into an order, minus the cart itself.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub order_number: OrderNumber,
    pub shipping_address: ShippingAddress,
    pub placed_at: DateTime<Utc>,
}

/// Durable mapping from owner to cart, plus the owner's orders.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Return the owner's cart, creating an empty one if none exists.
    async fn get_or_create(&self, owner: UserId) -> Result<Cart, StoreError>;

    /// Apply a mutation to the owner's cart and return the committed snapshot.
    ///
    /// The version is bumped on commit. Only mutations that
    /// [create carts](CartMutation::creates_cart) succeed on a missing cart.
    async fn apply(&self, owner: UserId, mutation: &CartMutation) -> Result<Cart, StoreError>;

    /// Snapshot the owner's cart into a new pending order and empty the cart,
    /// as one atomic step.
    ///
    /// Fails with `CartError::EmptyCart` (and writes nothing) when the cart is
    /// missing or has no lines.
    async fn place_order(&self, owner: UserId, draft: OrderDraft) -> Result<Order, StoreError>;

    /// The owner's orders, newest first.
    async fn list_orders(&self, owner: UserId) -> Result<Vec<Order>, StoreError>;

    /// One of the owner's orders. Orders of other owners are invisible.
    async fn get_order(&self, owner: UserId, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}
