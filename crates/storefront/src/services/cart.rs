//! Cart Service.
//!
//! Stateless request-level operations over a [`CartStore`]. Each call is one
//! transaction against one owner's cart and returns the authoritative snapshot.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use emporium_core::api::{AddItemRequest, CreateOrderRequest};
use emporium_core::{Cart, CartMutation, Order, OrderId, OrderNumber, ProductId, UserId};

use crate::error::AppError;
use crate::store::{CartStore, OrderDraft};

/// Cart and order operations for authenticated owners.
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn CartStore>,
}

impl CartService {
    #[must_use]
    pub fn new(store: Arc<dyn CartStore>) -> Self {
        Self { store }
    }

    /// Existing cart, or a freshly created empty one.
    ///
    /// # Errors
    ///
    /// Fails only when the store is unavailable.
    #[instrument(skip(self))]
    pub async fn get(&self, owner: UserId) -> Result<Cart, AppError> {
        Ok(self.store.get_or_create(owner).await?)
    }

    /// Increment-or-append a line.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed lines, or a store error.
    #[instrument(skip(self, request), fields(product_id = %request.product_id))]
    pub async fn add_item(&self, owner: UserId, request: AddItemRequest) -> Result<Cart, AppError> {
        let mutation = request.into_mutation()?;
        self.apply(owner, mutation).await
    }

    /// Overwrite a line's quantity; zero or less removes it.
    ///
    /// # Errors
    ///
    /// Returns not-found when the cart or the line is missing.
    #[instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        owner: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Cart, AppError> {
        self.apply(owner, CartMutation::SetQuantity { product_id, quantity })
            .await
    }

    /// Drop a line. Absent lines are not an error.
    ///
    /// # Errors
    ///
    /// Returns not-found when the owner has no cart yet.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, owner: UserId, product_id: ProductId) -> Result<Cart, AppError> {
        self.apply(owner, CartMutation::Remove { product_id }).await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns not-found when the owner has no cart yet.
    #[instrument(skip(self))]
    pub async fn clear(&self, owner: UserId) -> Result<Cart, AppError> {
        self.apply(owner, CartMutation::Clear).await
    }

    async fn apply(&self, owner: UserId, mutation: CartMutation) -> Result<Cart, AppError> {
        let cart = self.store.apply(owner, &mutation).await?;
        tracing::debug!(
            mutation = mutation.name(),
            version = cart.version,
            items = cart.items.len(),
            "cart committed"
        );
        Ok(cart)
    }

    /// Turn the cart into a pending order and empty it.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an incomplete address, or a bad request
    /// when the cart is empty.
    #[instrument(skip(self, request))]
    pub async fn create_order(
        &self,
        owner: UserId,
        request: CreateOrderRequest,
    ) -> Result<Order, AppError> {
        let shipping_address = request.into_address()?;
        let placed_at = Utc::now();
        let order_number = OrderNumber::generate(placed_at, &mut rand::rng());

        let order = self
            .store
            .place_order(
                owner,
                OrderDraft {
                    order_number,
                    shipping_address,
                    placed_at,
                },
            )
            .await?;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total_price,
            "order placed"
        );
        Ok(order)
    }

    /// The owner's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, owner: UserId) -> Result<Vec<Order>, AppError> {
        Ok(self.store.list_orders(owner).await?)
    }

    /// One of the owner's orders.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` when the order does not exist or belongs
    /// to someone else.
    #[instrument(skip(self))]
    pub async fn get_order(&self, owner: UserId, id: OrderId) -> Result<Order, AppError> {
        self.store
            .get_order(owner, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
    }

    /// Check that the store answers.
    ///
    /// # Errors
    ///
    /// Returns the store error when it does not.
    pub async fn ping(&self) -> Result<(), AppError> {
        Ok(self.store.ping().await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryCartStore;
    use emporium_core::api::ValidationError;
    use emporium_core::{CartError, ShippingAddress};
    use rust_decimal::Decimal;

    fn service() -> CartService {
        CartService::new(Arc::new(MemoryCartStore::new()))
    }

    fn add(id: i32, price: i64, quantity: u32) -> AddItemRequest {
        AddItemRequest {
            product_id: ProductId::new(id),
            title: format!("Product {id}"),
            price: Decimal::new(price, 2),
            image: format!("https://cdn.example.com/{id}.jpg"),
            quantity,
        }
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            street: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip_code: "62701".to_string(),
            country: "US".to_string(),
        }
    }

    const OWNER: UserId = UserId::new(7);

    #[tokio::test]
    async fn test_add_accumulates_quantity() {
        let carts = service();
        carts.add_item(OWNER, add(1, 500, 1)).await.unwrap();
        let cart = carts.add_item(OWNER, add(1, 500, 2)).await.unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 3);
        assert_eq!(cart.total_price, Decimal::new(1500, 2));
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_line() {
        let err = service()
            .add_item(OWNER, add(1, -1, 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::NegativePrice)
        ));
    }

    #[tokio::test]
    async fn test_add_rejects_out_of_range_price() {
        let carts = service();
        let mut huge = add(9, 0, 2);
        huge.price = Decimal::MAX;

        let err = carts.add_item(OWNER, huge).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Validation(ValidationError::PriceTooLarge)
        ));
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_largest_line_fits() {
        let carts = service();
        let mut line = add(1, 0, u32::MAX);
        line.price = emporium_core::MAX_UNIT_PRICE;

        let cart = carts.add_item(OWNER, line).await.unwrap();

        assert_eq!(
            cart.total_price,
            emporium_core::MAX_UNIT_PRICE * Decimal::from(u32::MAX)
        );
    }

    #[tokio::test]
    async fn test_set_quantity_zero_removes_line() {
        let carts = service();
        carts.add_item(OWNER, add(1, 500, 3)).await.unwrap();
        carts.add_item(OWNER, add(2, 250, 1)).await.unwrap();

        let cart = carts
            .set_quantity(OWNER, ProductId::new(1), 0)
            .await
            .unwrap();
        assert!(cart.line(ProductId::new(1)).is_none());
        assert_eq!(cart.total_price, Decimal::new(250, 2));
    }

    #[tokio::test]
    async fn test_set_quantity_missing_cart() {
        let err = service()
            .set_quantity(OWNER, ProductId::new(1), 2)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Store(crate::store::StoreError::Cart(CartError::CartNotFound))
        ));
    }

    #[tokio::test]
    async fn test_create_order_on_empty_cart_leaves_cart() {
        let carts = service();
        let before = carts.get(OWNER).await.unwrap();

        let err = carts
            .create_order(
                OWNER,
                CreateOrderRequest {
                    shipping_address: address(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Store(crate::store::StoreError::Cart(CartError::EmptyCart))
        ));
        assert_eq!(carts.get(OWNER).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_create_order_snapshots_and_clears() {
        let carts = service();
        let cart = carts.add_item(OWNER, add(1, 1999, 2)).await.unwrap();

        let order = carts
            .create_order(
                OWNER,
                CreateOrderRequest {
                    shipping_address: address(),
                },
            )
            .await
            .unwrap();

        assert_eq!(order.items, cart.items);
        assert_eq!(order.total_price, cart.total_price);
        assert!(order.order_number.as_str().starts_with("ORD"));

        let after = carts.get(OWNER).await.unwrap();
        assert!(after.items.is_empty());
        assert_eq!(after.total_price, Decimal::ZERO);

        assert_eq!(carts.get_order(OWNER, order.id).await.unwrap(), order);
        assert!(matches!(
            carts.get_order(UserId::new(8), order.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
