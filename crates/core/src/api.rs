//! Request and response bodies exchanged between the cart client and the
//! storefront API.
//!
//! Bodies are camelCase JSON. Requests are validated here, at the service
//! boundary, before anything touches the cart store.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{CartMutation, MAX_UNIT_PRICE, ProductId, ProductSnapshot, ShippingAddress};

/// A request body that deserialized but violates a field constraint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Blank(&'static str),

    #[error("price cannot be negative")]
    NegativePrice,

    #[error("price cannot exceed {MAX_UNIT_PRICE}")]
    PriceTooLarge,

    #[error("quantity must be at least 1")]
    ZeroQuantity,

    #[error("shipping address is missing: {}", .0.join(", "))]
    IncompleteAddress(Vec<&'static str>),
}

const fn default_quantity() -> u32 {
    1
}

/// Body of `POST /cart/add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub title: String,
    pub price: Decimal,
    pub image: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

impl AddItemRequest {
    /// Build a request for `quantity` units of a catalog product.
    #[must_use]
    pub fn new(product: &ProductSnapshot, quantity: u32) -> Self {
        Self {
            product_id: product.product_id,
            title: product.title.clone(),
            price: product.unit_price,
            image: product.image.clone(),
            quantity,
        }
    }

    /// Validate the body and turn it into a cart mutation.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for a blank title or image, a negative or
    /// out-of-range price, or a zero quantity.
    pub fn into_mutation(self) -> Result<CartMutation, ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::Blank("title"));
        }
        if self.image.trim().is_empty() {
            return Err(ValidationError::Blank("image"));
        }
        if self.price.is_sign_negative() && !self.price.is_zero() {
            return Err(ValidationError::NegativePrice);
        }
        if self.price > MAX_UNIT_PRICE {
            return Err(ValidationError::PriceTooLarge);
        }
        if self.quantity == 0 {
            return Err(ValidationError::ZeroQuantity);
        }

        Ok(CartMutation::Add {
            product: ProductSnapshot {
                product_id: self.product_id,
                title: self.title,
                unit_price: self.price,
                image: self.image,
            },
            quantity: self.quantity,
        })
    }
}

/// Body of `PUT /cart/update/{productId}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateQuantityRequest {
    /// New quantity; zero or less removes the line.
    pub quantity: i64,
}

/// Body of `POST /orders/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub shipping_address: ShippingAddress,
}

impl CreateOrderRequest {
    /// Validate the body and return the shipping address.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::IncompleteAddress` listing blank fields.
    pub fn into_address(self) -> Result<ShippingAddress, ValidationError> {
        let missing = self.shipping_address.missing_fields();
        if missing.is_empty() {
            Ok(self.shipping_address)
        } else {
            Err(ValidationError::IncompleteAddress(missing))
        }
    }
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}
