//! Decimal money arithmetic and checkout totals.
//!
//! The storefront trades in a single currency. Amounts are `Decimal` in the
//! currency's standard unit (dollars, not cents) so line totals never pick up
//! floating point drift.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Sales tax applied at checkout (8%).
pub const TAX_RATE: Decimal = Decimal::from_parts(8, 0, 0, false, 2);

/// Flat shipping charge. Shipping is free.
pub const SHIPPING_FLAT: Decimal = Decimal::ZERO;

/// Highest unit price a cart line accepts.
///
/// Keeps every cart total, and the tax on it, well inside `Decimal`'s range.
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Round an amount to whole cents, halves away from zero.
#[must_use]
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Totals shown on the cart and checkout pages.
///
/// Derived from a cart subtotal with fixed rates; nothing here is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutTotals {
    /// Sum of line totals.
    pub subtotal: Decimal,
    /// Shipping charge.
    pub shipping: Decimal,
    /// Tax on the subtotal, rounded to cents.
    pub tax: Decimal,
    /// Amount the customer pays.
    pub total: Decimal,
}

impl CheckoutTotals {
    /// Compute checkout totals from a subtotal.
    #[must_use]
    pub fn from_subtotal(subtotal: Decimal) -> Self {
        let tax = round_cents(subtotal * TAX_RATE);
        Self {
            subtotal,
            shipping: SHIPPING_FLAT,
            tax,
            total: subtotal.saturating_add(SHIPPING_FLAT).saturating_add(tax),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_is_eight_percent() {
        assert_eq!(TAX_RATE, Decimal::new(8, 2));
    }

    #[test]
    fn test_checkout_totals() {
        let totals = CheckoutTotals::from_subtotal(Decimal::new(10_000, 2));
        assert_eq!(totals.tax, Decimal::new(800, 2));
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::new(10_800, 2));
    }

    #[test]
    fn test_tax_rounds_half_up_to_cents() {
        // 10.15625 * 0.08 = 0.8125
        let totals = CheckoutTotals::from_subtotal(Decimal::new(1_015_625, 5));
        assert_eq!(totals.tax, Decimal::new(81, 2));

        assert_eq!(round_cents(Decimal::new(125, 3)), Decimal::new(13, 2));
    }

    #[test]
    fn test_empty_subtotal() {
        let totals = CheckoutTotals::from_subtotal(Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
    }
}
