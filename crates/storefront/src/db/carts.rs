//! `PostgreSQL` cart store.
//!
//! Per-owner transactions lock the owner's cart row with `SELECT ... FOR UPDATE`,
//! so concurrent requests for one owner serialize while other owners proceed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use emporium_core::{
    Cart, CartError, CartItem, CartMutation, Order, OrderId, OrderNumber, ShippingAddress, UserId,
};

use crate::store::{CartStore, OrderDraft, StoreError};

const CART_COLUMNS: &str = "owner_id, items, total_price, version";
const ORDER_COLUMNS: &str = "id, owner_id, order_number, items, total_price, \
     status::TEXT AS status, shipping_address, created_at";

#[derive(sqlx::FromRow)]
struct CartRow {
    owner_id: UserId,
    items: Json<Vec<CartItem>>,
    total_price: Decimal,
    version: i64,
}

impl TryFrom<CartRow> for Cart {
    type Error = StoreError;

    fn try_from(row: CartRow) -> Result<Self, Self::Error> {
        let version = u64::try_from(row.version).map_err(|_| {
            StoreError::DataCorruption(format!("negative cart version: {}", row.version))
        })?;

        Ok(Self {
            owner_id: row.owner_id,
            items: row.items.0,
            total_price: row.total_price,
            version,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    owner_id: UserId,
    order_number: String,
    items: Json<Vec<CartItem>>,
    total_price: Decimal,
    status: String,
    shipping_address: Json<ShippingAddress>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|e: String| StoreError::DataCorruption(e))?;

        Ok(Self {
            id: row.id,
            owner_id: row.owner_id,
            order_number: OrderNumber::from_stored(row.order_number),
            items: row.items.0,
            total_price: row.total_price,
            status,
            shipping_address: row.shipping_address.0,
            created_at: row.created_at,
        })
    }
}

/// Cart store backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ensure_cart(conn: &mut PgConnection, owner: UserId) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO storefront.cart (owner_id) VALUES ($1) ON CONFLICT (owner_id) DO NOTHING",
        )
        .bind(owner)
        .execute(conn)
        .await?;
        Ok(())
    }

    async fn lock_cart(conn: &mut PgConnection, owner: UserId) -> Result<Option<Cart>, StoreError> {
        let row = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM storefront.cart WHERE owner_id = $1 FOR UPDATE"
        ))
        .bind(owner)
        .fetch_optional(conn)
        .await?;

        row.map(Cart::try_from).transpose()
    }

    async fn save_cart(conn: &mut PgConnection, cart: &Cart) -> Result<(), StoreError> {
        let version = i64::try_from(cart.version)
            .map_err(|_| StoreError::DataCorruption("cart version overflow".to_owned()))?;

        sqlx::query(
            r"
            UPDATE storefront.cart
            SET items = $2, total_price = $3, version = $4, updated_at = now()
            WHERE owner_id = $1
            ",
        )
        .bind(cart.owner_id)
        .bind(Json(&cart.items))
        .bind(cart.total_price)
        .bind(version)
        .execute(conn)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl CartStore for PgCartStore {
    #[instrument(skip(self))]
    async fn get_or_create(&self, owner: UserId) -> Result<Cart, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Self::ensure_cart(&mut conn, owner).await?;

        let row = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM storefront.cart WHERE owner_id = $1"
        ))
        .bind(owner)
        .fetch_one(&mut *conn)
        .await?;

        Cart::try_from(row)
    }

    #[instrument(skip(self, mutation), fields(mutation = mutation.name()))]
    async fn apply(&self, owner: UserId, mutation: &CartMutation) -> Result<Cart, StoreError> {
        let mut tx = self.pool.begin().await?;

        if mutation.creates_cart() {
            Self::ensure_cart(&mut tx, owner).await?;
        }

        // Dropping `tx` on any early return rolls back.
        let mut cart = Self::lock_cart(&mut tx, owner)
            .await?
            .ok_or(CartError::CartNotFound)?;

        cart.apply(mutation)?;
        cart.bump_version();
        Self::save_cart(&mut tx, &cart).await?;

        tx.commit().await?;
        Ok(cart)
    }

    #[instrument(skip(self, draft), fields(order_number = %draft.order_number))]
    async fn place_order(&self, owner: UserId, draft: OrderDraft) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;

        let mut cart = Self::lock_cart(&mut tx, owner)
            .await?
            .filter(|cart| !cart.is_empty())
            .ok_or(CartError::EmptyCart)?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO storefront.customer_order
                (owner_id, order_number, items, total_price, shipping_address, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(owner)
        .bind(draft.order_number.as_str())
        .bind(Json(&cart.items))
        .bind(cart.total_price)
        .bind(Json(&draft.shipping_address))
        .bind(draft.placed_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::Conflict("order number already exists".to_owned());
            }
            StoreError::Database(e)
        })?;

        let order = Order::try_from(row)?;

        cart.clear();
        cart.bump_version();
        Self::save_cart(&mut tx, &cart).await?;

        tx.commit().await?;
        Ok(order)
    }

    #[instrument(skip(self))]
    async fn list_orders(&self, owner: UserId) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM storefront.customer_order
            WHERE owner_id = $1
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn get_order(&self, owner: UserId, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.customer_order WHERE id = $1 AND owner_id = $2"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
