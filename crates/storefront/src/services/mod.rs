//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Bearer token signing and verification
//! - `cart` - Cart Service: validated, per-owner transactional cart and order operations

pub mod auth;
pub mod cart;

pub use cart::CartService;
