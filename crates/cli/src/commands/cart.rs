//! Drive a cart through the client controller from a terminal.
//!
//! # Environment Variables
//!
//! - `CART_API_URL` - Base URL of the cart API (default: `http://localhost:5000/api`)
//! - `CART_REQUEST_TIMEOUT_MS` - Per-request bound in milliseconds
//! - `CART_API_TOKEN` - Bearer token (see `emporium-cli token issue`)
//! - `CART_USER_ID` - The user the token was issued for

use std::sync::Arc;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

use emporium_cart_client::config::ConfigError;
use emporium_cart_client::{CartController, ClientConfig, ClientError, HttpCartApi, Identity};
use emporium_core::{
    Cart, MAX_UNIT_PRICE, Order, ProductId, ProductSnapshot, ShippingAddress, UserId,
};

#[derive(Debug, Error)]
pub enum CartCommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(&'static str, String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Client(#[from] ClientError),
}

/// What to do with the cart.
#[derive(Debug)]
pub enum CartAction {
    Show,
    Add {
        product: ProductSnapshot,
        quantity: u32,
    },
    Update {
        product_id: ProductId,
        quantity: i64,
    },
    Remove {
        product_id: ProductId,
    },
    Clear,
    Checkout {
        address: ShippingAddress,
    },
    Orders,
}

/// Build a signed-in controller from the environment.
async fn connect() -> Result<CartController, CartCommandError> {
    dotenvy::dotenv().ok();

    let config = ClientConfig::from_env()?;
    let token = std::env::var("CART_API_TOKEN")
        .map(SecretString::from)
        .map_err(|_| CartCommandError::MissingEnvVar("CART_API_TOKEN"))?;
    let user_id = std::env::var("CART_USER_ID")
        .map_err(|_| CartCommandError::MissingEnvVar("CART_USER_ID"))?
        .parse::<i32>()
        .map_err(|e| CartCommandError::InvalidEnvVar("CART_USER_ID", e.to_string()))?;

    tracing::debug!(api_url = %config.api_url, "Connecting to cart API");
    let controller = CartController::new(
        Arc::new(HttpCartApi::new(&config)),
        config.request_timeout,
    );
    controller
        .set_identity(Some(Identity::new(UserId::new(user_id), token)))
        .await?;
    Ok(controller)
}

/// Run one cart action and print the resulting cart (or orders).
///
/// # Errors
///
/// Returns `CartCommandError` if the environment is incomplete or the API
/// rejects the action.
pub async fn run(action: CartAction) -> Result<(), CartCommandError> {
    let controller = connect().await?;

    match action {
        CartAction::Show => {}
        CartAction::Add { product, quantity } => {
            controller.add_to_cart(product, quantity).await?;
        }
        CartAction::Update {
            product_id,
            quantity,
        } => {
            controller.update_quantity(product_id, quantity).await?;
        }
        CartAction::Remove { product_id } => {
            controller.remove_from_cart(product_id).await?;
        }
        CartAction::Clear => {
            controller.clear_cart().await?;
        }
        CartAction::Checkout { address } => {
            let order = controller.place_order(address).await?;
            print_order(&order);
            return Ok(());
        }
        CartAction::Orders => {
            let orders = controller.orders().await?;
            if orders.is_empty() {
                print_line("No orders");
            }
            for order in &orders {
                print_order(order);
            }
            return Ok(());
        }
    }

    match controller.cart() {
        Some(cart) => print_cart(&cart),
        None => print_line("No cart"),
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_line(line: &str) {
    println!("{line}");
}

fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        print_line("Cart is empty");
        return;
    }
    for item in &cart.items {
        let line_total = item
            .line_total()
            .map_or_else(|| "overflow".to_string(), |total| total.to_string());
        print_line(&format!(
            "{:>6}  {:<32} {:>4} x {:>10} = {:>10}",
            item.product_id, item.title, item.quantity, item.unit_price, line_total
        ));
    }
    let totals = cart.checkout_totals();
    print_line(&format!(
        "{} items, subtotal {}, shipping {}, tax {}, total {}",
        cart.item_count(),
        totals.subtotal,
        totals.shipping,
        totals.tax,
        totals.total
    ));
}

fn print_order(order: &Order) {
    print_line(&format!(
        "{}  {:<10} {:>10}  {} lines  {}",
        order.order_number,
        order.status,
        order.total_price,
        order.items.len(),
        order.created_at.format("%Y-%m-%d %H:%M")
    ));
}

/// Parse a price like `19.99`, with the storefront's bounds.
///
/// A negative zero is accepted as zero.
///
/// # Errors
///
/// Returns a message if the value is not a decimal in `0..=MAX_UNIT_PRICE`.
pub fn parse_price(value: &str) -> Result<Decimal, String> {
    let price = value
        .parse::<Decimal>()
        .map_err(|e| format!("invalid price {value}: {e}"))?;
    if price.is_zero() {
        return Ok(Decimal::ZERO);
    }
    if price.is_sign_negative() {
        return Err(format!("price cannot be negative: {value}"));
    }
    if price > MAX_UNIT_PRICE {
        return Err(format!("price cannot exceed {MAX_UNIT_PRICE}: {value}"));
    }
    Ok(price)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("19.99").unwrap(), Decimal::new(1999, 2));
        assert!(parse_price("-1").is_err());
        assert!(parse_price("abc").is_err());
        assert!(parse_price("1000000000.01").is_err());
    }

    #[test]
    fn test_parse_negative_zero_price() {
        let price = parse_price("-0").unwrap();
        assert_eq!(price, Decimal::ZERO);
        assert!(!price.is_sign_negative());

        let price = parse_price("-0.00").unwrap();
        assert!(!price.is_sign_negative());
    }
}
