//! Keys for concurrently trackable actions.

use std::fmt;

use emporium_core::{CartMutation, ProductId};

/// Identifies one logical in-flight operation.
///
/// At most one action per key is in flight at a time. Displayed the way UI
/// code names its loading flags: `add-12`, `update-12`, `remove-12`, `clear`,
/// `checkout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionKey {
    Add(ProductId),
    Update(ProductId),
    Remove(ProductId),
    Clear,
    Checkout,
}

impl ActionKey {
    /// The key an optimistic cart mutation is tracked under.
    #[must_use]
    pub const fn for_mutation(mutation: &CartMutation) -> Self {
        match mutation {
            CartMutation::Add { product, .. } => Self::Add(product.product_id),
            CartMutation::SetQuantity { product_id, .. } => Self::Update(*product_id),
            CartMutation::Remove { product_id } => Self::Remove(*product_id),
            CartMutation::Clear => Self::Clear,
        }
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add(id) => write!(f, "add-{id}"),
            Self::Update(id) => write!(f, "update-{id}"),
            Self::Remove(id) => write!(f, "remove-{id}"),
            Self::Clear => f.write_str("clear"),
            Self::Checkout => f.write_str("checkout"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let id = ProductId::new(12);
        assert_eq!(ActionKey::Add(id).to_string(), "add-12");
        assert_eq!(ActionKey::Update(id).to_string(), "update-12");
        assert_eq!(ActionKey::Remove(id).to_string(), "remove-12");
        assert_eq!(ActionKey::Clear.to_string(), "clear");
        assert_eq!(ActionKey::Checkout.to_string(), "checkout");
    }

    #[test]
    fn test_keys_are_per_product() {
        let set = |product_id| CartMutation::SetQuantity {
            product_id,
            quantity: 1,
        };
        assert_ne!(
            ActionKey::for_mutation(&set(ProductId::new(1))),
            ActionKey::for_mutation(&set(ProductId::new(2)))
        );
        assert_eq!(
            ActionKey::for_mutation(&CartMutation::Remove {
                product_id: ProductId::new(3)
            }),
            ActionKey::Remove(ProductId::new(3))
        );
    }
}
