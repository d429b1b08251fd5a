//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction)
//! 2. `TraceLayer` (request span with method, uri, status, latency)
//! 3. Request ID (reuse or generate `x-request-id`, record on span)
//! 4. CORS (only when an origin is configured)
//!
//! Authentication is an extractor ([`RequireAuth`]) rather than a layer so
//! `/health` stays public.

pub mod auth;
pub mod request_id;

pub use auth::RequireAuth;
pub use request_id::request_id_middleware;
