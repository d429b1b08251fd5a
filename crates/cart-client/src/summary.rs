//! Derived cart summary.

use rust_decimal::Decimal;

use emporium_core::Cart;

/// What a cart badge or checkout button needs to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartSummary {
    /// Sum of line quantities.
    pub item_count: u64,
    /// The cart's total price.
    pub subtotal: Decimal,
    /// No lines, or no cart at all.
    pub is_empty: bool,
}

impl CartSummary {
    /// Summarize a shadow cart. An absent cart is empty.
    #[must_use]
    pub fn of(cart: Option<&Cart>) -> Self {
        cart.map_or(
            Self {
                item_count: 0,
                subtotal: Decimal::ZERO,
                is_empty: true,
            },
            |cart| Self {
                item_count: cart.item_count(),
                subtotal: cart.total_price,
                is_empty: cart.is_empty(),
            },
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use emporium_core::{ProductId, ProductSnapshot, UserId};

    #[test]
    fn test_absent_cart_is_empty() {
        let summary = CartSummary::of(None);
        assert!(summary.is_empty);
        assert_eq!(summary.item_count, 0);
        assert_eq!(summary.subtotal, Decimal::ZERO);
    }

    #[test]
    fn test_counts_quantities_not_lines() {
        let mut cart = Cart::empty(UserId::new(1));
        for (id, quantity) in [(1, 2), (2, 3)] {
            let product = ProductSnapshot {
                product_id: ProductId::new(id),
                title: format!("Product {id}"),
                unit_price: Decimal::new(100, 2),
                image: String::new(),
            };
            cart.add_item(&product, quantity).unwrap();
        }

        let summary = CartSummary::of(Some(&cart));
        assert_eq!(summary.item_count, 5);
        assert_eq!(summary.subtotal, Decimal::new(500, 2));
        assert!(!summary.is_empty);
    }
}
