//! In-memory cart store.
//!
//! Each owner's cart and orders sit behind one async mutex, so a mutation or
//! an order placement for that owner is serialized and observed atomically.
//! Nothing survives a restart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::instrument;

use emporium_core::{Cart, CartError, CartMutation, Order, OrderId, OrderStatus, UserId};

use super::{CartStore, OrderDraft, StoreError};

#[derive(Debug, Default)]
struct OwnerRecord {
    cart: Option<Cart>,
    /// Oldest first.
    orders: Vec<Order>,
}

/// Cart store backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryCartStore {
    owners: RwLock<HashMap<UserId, Arc<Mutex<OwnerRecord>>>>,
    last_order_id: AtomicI32,
}

impl MemoryCartStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, owner: UserId) -> Arc<Mutex<OwnerRecord>> {
        if let Some(record) = self
            .owners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&owner)
        {
            return Arc::clone(record);
        }

        let mut owners = self.owners.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(owners.entry(owner).or_default())
    }

    fn next_order_id(&self) -> OrderId {
        OrderId::new(self.last_order_id.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[async_trait]
impl CartStore for MemoryCartStore {
    #[instrument(skip(self))]
    async fn get_or_create(&self, owner: UserId) -> Result<Cart, StoreError> {
        let record = self.record(owner);
        let mut record = record.lock().await;
        Ok(record.cart.get_or_insert_with(|| Cart::empty(owner)).clone())
    }

    #[instrument(skip(self, mutation), fields(mutation = mutation.name()))]
    async fn apply(&self, owner: UserId, mutation: &CartMutation) -> Result<Cart, StoreError> {
        let record = self.record(owner);
        let mut record = record.lock().await;

        let mut cart = match (&record.cart, mutation.creates_cart()) {
            (Some(cart), _) => cart.clone(),
            (None, true) => Cart::empty(owner),
            (None, false) => return Err(CartError::CartNotFound.into()),
        };

        cart.apply(mutation)?;
        cart.bump_version();
        record.cart = Some(cart.clone());

        Ok(cart)
    }

    #[instrument(skip(self, draft), fields(order_number = %draft.order_number))]
    async fn place_order(&self, owner: UserId, draft: OrderDraft) -> Result<Order, StoreError> {
        let record = self.record(owner);
        let mut guard = record.lock().await;
        let record = &mut *guard;

        if record
            .orders
            .iter()
            .any(|order| order.order_number == draft.order_number)
        {
            return Err(StoreError::Conflict("order number already exists".to_owned()));
        }

        let Some(cart) = record.cart.as_mut().filter(|cart| !cart.is_empty()) else {
            return Err(CartError::EmptyCart.into());
        };

        let order = Order {
            id: self.next_order_id(),
            owner_id: owner,
            order_number: draft.order_number,
            items: cart.items.clone(),
            total_price: cart.total_price,
            status: OrderStatus::Pending,
            shipping_address: draft.shipping_address,
            created_at: draft.placed_at,
        };

        cart.clear();
        cart.bump_version();
        record.orders.push(order.clone());

        Ok(order)
    }

    async fn list_orders(&self, owner: UserId) -> Result<Vec<Order>, StoreError> {
        let record = self.record(owner);
        let record = record.lock().await;
        Ok(record.orders.iter().rev().cloned().collect())
    }

    async fn get_order(&self, owner: UserId, id: OrderId) -> Result<Option<Order>, StoreError> {
        let record = self.record(owner);
        let record = record.lock().await;
        Ok(record.orders.iter().find(|order| order.id == id).cloned())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use emporium_core::{OrderNumber, ProductId, ProductSnapshot, ShippingAddress};

    use super::*;

    const OWNER: UserId = UserId::new(1);

    fn add(id: i32, cents: i64, quantity: u32) -> CartMutation {
        CartMutation::Add {
            product: ProductSnapshot {
                product_id: ProductId::new(id),
                title: format!("Product {id}"),
                unit_price: Decimal::new(cents, 2),
                image: format!("{id}.png"),
            },
            quantity,
        }
    }

    fn draft(number: &str) -> OrderDraft {
        OrderDraft {
            order_number: OrderNumber::from_stored(number.to_string()),
            shipping_address: ShippingAddress {
                street: "1 Main St".to_string(),
                city: "Springfield".to_string(),
                state: "IL".to_string(),
                zip_code: "62701".to_string(),
                country: "US".to_string(),
            },
            placed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_get_creates_empty_cart_once() {
        let store = MemoryCartStore::new();

        let first = store.get_or_create(OWNER).await.unwrap();
        assert!(first.is_empty());
        assert_eq!(first.version, 0);

        store.apply(OWNER, &add(1, 500, 1)).await.unwrap();
        let second = store.get_or_create(OWNER).await.unwrap();
        assert_eq!(second.items.len(), 1);
    }

    #[tokio::test]
    async fn test_apply_bumps_version() {
        let store = MemoryCartStore::new();
        let cart = store.apply(OWNER, &add(1, 500, 1)).await.unwrap();
        assert_eq!(cart.version, 1);
        let cart = store
            .apply(
                OWNER,
                &CartMutation::Remove {
                    product_id: ProductId::new(9),
                },
            )
            .await
            .unwrap();
        assert_eq!(cart.version, 2);
    }

    #[tokio::test]
    async fn test_non_add_mutation_on_missing_cart() {
        let store = MemoryCartStore::new();
        let err = store.apply(OWNER, &CartMutation::Clear).await.unwrap_err();
        assert!(matches!(err, StoreError::Cart(CartError::CartNotFound)));
    }

    #[tokio::test]
    async fn test_failed_mutation_writes_nothing() {
        let store = MemoryCartStore::new();
        store.apply(OWNER, &add(1, 500, 1)).await.unwrap();

        let err = store
            .apply(
                OWNER,
                &CartMutation::SetQuantity {
                    product_id: ProductId::new(2),
                    quantity: 3,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Cart(CartError::ItemNotFound(_))));

        let cart = store.get_or_create(OWNER).await.unwrap();
        assert_eq!(cart.version, 1);
    }

    #[tokio::test]
    async fn test_place_order_on_empty_cart_leaves_it_untouched() {
        let store = MemoryCartStore::new();
        let before = store.get_or_create(OWNER).await.unwrap();

        let err = store.place_order(OWNER, draft("ORD1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Cart(CartError::EmptyCart)));

        assert_eq!(store.get_or_create(OWNER).await.unwrap(), before);
        assert!(store.list_orders(OWNER).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_place_order_snapshots_and_clears() {
        let store = MemoryCartStore::new();
        store.apply(OWNER, &add(1, 1_000, 2)).await.unwrap();
        let before = store.apply(OWNER, &add(2, 350, 1)).await.unwrap();

        let order = store.place_order(OWNER, draft("ORD1")).await.unwrap();
        assert_eq!(order.items, before.items);
        assert_eq!(order.total_price, before.total_price);
        assert_eq!(order.status, OrderStatus::Pending);

        let after = store.get_or_create(OWNER).await.unwrap();
        assert!(after.is_empty());
        assert_eq!(after.total_price, Decimal::ZERO);
        assert!(after.version > before.version);
    }

    #[tokio::test]
    async fn test_orders_are_scoped_to_owner() {
        let store = MemoryCartStore::new();
        store.apply(OWNER, &add(1, 1_000, 1)).await.unwrap();
        let order = store.place_order(OWNER, draft("ORD1")).await.unwrap();

        let stranger = UserId::new(2);
        assert!(store.get_order(stranger, order.id).await.unwrap().is_none());
        assert_eq!(
            store.get_order(OWNER, order.id).await.unwrap().unwrap(),
            order
        );
    }

    #[tokio::test]
    async fn test_orders_newest_first() {
        let store = MemoryCartStore::new();
        store.apply(OWNER, &add(1, 100, 1)).await.unwrap();
        let first = store.place_order(OWNER, draft("ORD1")).await.unwrap();
        store.apply(OWNER, &add(2, 100, 1)).await.unwrap();
        let second = store.place_order(OWNER, draft("ORD2")).await.unwrap();

        let orders = store.list_orders(OWNER).await.unwrap();
        assert_eq!(orders, vec![second, first]);
    }

    #[tokio::test]
    async fn test_concurrent_adds_for_one_owner_all_land() {
        let store = Arc::new(MemoryCartStore::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.apply(OWNER, &add(1, 100, 1)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let cart = store.get_or_create(OWNER).await.unwrap();
        assert_eq!(cart.items[0].quantity, 16);
        assert_eq!(cart.version, 16);
    }
}
