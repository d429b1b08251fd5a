//! Emporium Core - Shared cart and order domain.
//!
//! This crate provides the types used by every Emporium component:
//! - `storefront` - Cart service and server-of-record HTTP API
//! - `cart-client` - Client-side cart controller with optimistic updates
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Cart arithmetic lives here so that the server's
//! authoritative mutation and the client's optimistic preview are the same code.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, money, carts, orders
//! - [`api`] - Wire bodies and boundary validation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod types;

pub use types::*;
