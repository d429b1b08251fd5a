//! Cart entity and the arithmetic every cart mutation goes through.
//!
//! The server applies a [`CartMutation`] inside a store transaction to produce
//! the authoritative snapshot; the client applies the same mutation to its
//! shadow copy to render an optimistic preview. Both paths share
//! [`Cart::apply`] so the preview can only differ from the server when the
//! server saw other writes first.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::{ProductId, UserId};
use super::money::CheckoutTotals;

/// Errors produced by cart arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The owner has no cart yet.
    #[error("Cart not found")]
    CartNotFound,

    /// The cart has no line for this product.
    #[error("Item not found in cart")]
    ItemNotFound(ProductId),

    /// Orders cannot be placed from an empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Adding zero units is not a mutation.
    #[error("quantity must be at least 1")]
    ZeroQuantity,

    /// The resulting line quantity does not fit.
    #[error("quantity for product {0} is too large")]
    QuantityOverflow(ProductId),

    /// A line total or the cart total does not fit in a `Decimal`.
    #[error("cart total is too large")]
    TotalOverflow,
}

/// Catalog data captured when a product first enters a cart.
///
/// Title, price and image are fixed at first insertion; later adds of the
/// same product only accumulate quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub product_id: ProductId,
    pub title: String,
    #[serde(rename = "price")]
    pub unit_price: Decimal,
    pub image: String,
}

/// One line of a cart or order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub title: String,
    #[serde(rename = "price")]
    pub unit_price: Decimal,
    pub image: String,
    /// Always at least 1; a line reduced to zero is removed instead.
    pub quantity: u32,
}

impl CartItem {
    /// Price of the whole line, or `None` if it overflows.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}

/// A single intended change to a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartMutation {
    /// Increment an existing line or append a new one.
    Add {
        product: ProductSnapshot,
        quantity: u32,
    },
    /// Overwrite a line's quantity; zero or less removes the line.
    SetQuantity {
        product_id: ProductId,
        quantity: i64,
    },
    /// Drop a line if present.
    Remove { product_id: ProductId },
    /// Drop every line.
    Clear,
}

impl CartMutation {
    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::SetQuantity { .. } => "update",
            Self::Remove { .. } => "remove",
            Self::Clear => "clear",
        }
    }

    /// Whether applying this mutation lazily creates a missing cart.
    ///
    /// Only adds do; every other mutation on a missing cart is `CartNotFound`.
    #[must_use]
    pub const fn creates_cart(&self) -> bool {
        matches!(self, Self::Add { .. })
    }
}

/// A user's shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub owner_id: UserId,
    /// Lines in insertion order.
    pub items: Vec<CartItem>,
    /// Cached sum of line totals, recomputed after every mutation.
    pub total_price: Decimal,
    /// Bumped by the store on every committed mutation.
    #[serde(default)]
    pub version: u64,
}

impl Cart {
    /// An empty cart for `owner_id`.
    #[must_use]
    pub const fn empty(owner_id: UserId) -> Self {
        Self {
            owner_id,
            items: Vec::new(),
            total_price: Decimal::ZERO,
            version: 0,
        }
    }

    /// Find the line for a product.
    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Subtotal, tax and grand total for this cart.
    #[must_use]
    pub fn checkout_totals(&self) -> CheckoutTotals {
        CheckoutTotals::from_subtotal(self.total_price)
    }

    /// Add `quantity` units of a product.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ZeroQuantity` for a zero quantity,
    /// `CartError::QuantityOverflow` if the line would exceed `u32::MAX` and
    /// `CartError::TotalOverflow` if the new total does not fit.
    pub fn add_item(&mut self, product: &ProductSnapshot, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }

        let mut items = self.items.clone();
        match items
            .iter_mut()
            .find(|item| item.product_id == product.product_id)
        {
            Some(item) => {
                item.quantity = item
                    .quantity
                    .checked_add(quantity)
                    .ok_or(CartError::QuantityOverflow(product.product_id))?;
            }
            None => items.push(CartItem {
                product_id: product.product_id,
                title: product.title.clone(),
                unit_price: product.unit_price,
                image: product.image.clone(),
                quantity,
            }),
        }

        self.replace_items(items)
    }

    /// Overwrite a line's quantity, removing the line when `quantity <= 0`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the product has no line,
    /// `CartError::QuantityOverflow` if `quantity` exceeds `u32::MAX` and
    /// `CartError::TotalOverflow` if the new total does not fit.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: i64) -> Result<(), CartError> {
        let index = self
            .items
            .iter()
            .position(|item| item.product_id == product_id)
            .ok_or(CartError::ItemNotFound(product_id))?;

        let mut items = self.items.clone();
        if quantity <= 0 {
            items.remove(index);
        } else {
            let quantity =
                u32::try_from(quantity).map_err(|_| CartError::QuantityOverflow(product_id))?;
            if let Some(item) = items.get_mut(index) {
                item.quantity = quantity;
            }
        }

        self.replace_items(items)
    }

    /// Remove a product's line. Removing an absent product is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CartError::TotalOverflow` only if the remaining lines already
    /// held a total that does not fit, e.g. in a corrupt snapshot.
    pub fn remove_item(&mut self, product_id: ProductId) -> Result<(), CartError> {
        let items = self
            .items
            .iter()
            .filter(|item| item.product_id != product_id)
            .cloned()
            .collect();
        self.replace_items(items)
    }

    /// Remove every line and zero the total.
    pub fn clear(&mut self) {
        self.items.clear();
        self.total_price = Decimal::ZERO;
    }

    /// Apply a mutation in place.
    ///
    /// On error the cart is left unchanged.
    ///
    /// # Errors
    ///
    /// Propagates the error of the underlying operation.
    pub fn apply(&mut self, mutation: &CartMutation) -> Result<(), CartError> {
        match mutation {
            CartMutation::Add { product, quantity } => self.add_item(product, *quantity),
            CartMutation::SetQuantity {
                product_id,
                quantity,
            } => self.set_quantity(*product_id, *quantity),
            CartMutation::Remove { product_id } => self.remove_item(*product_id),
            CartMutation::Clear => {
                self.clear();
                Ok(())
            }
        }
    }

    /// Mark this snapshot as one committed write newer.
    pub const fn bump_version(&mut self) {
        self.version = self.version.saturating_add(1);
    }

    /// Swap in new lines and their total, leaving the cart untouched if the
    /// total overflows.
    fn replace_items(&mut self, items: Vec<CartItem>) -> Result<(), CartError> {
        let total = items.iter().try_fold(Decimal::ZERO, |total, item| {
            item.line_total()
                .and_then(|line| total.checked_add(line))
                .ok_or(CartError::TotalOverflow)
        })?;
        self.items = items;
        self.total_price = total;
        Ok(())
    }
}
