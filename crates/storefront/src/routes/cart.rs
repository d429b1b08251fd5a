//! Cart route handlers.
//!
//! Every handler returns the authoritative cart snapshot as JSON.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};
use tracing::instrument;

use emporium_core::api::{AddItemRequest, UpdateQuantityRequest};
use emporium_core::{Cart, ProductId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Fetch the cart, creating it on first access.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(owner): RequireAuth,
) -> Result<Json<Cart>> {
    Ok(Json(state.carts().get(owner).await?))
}

/// Add a line, or increase the quantity of an existing one.
#[instrument(skip(state, body))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(owner): RequireAuth,
    body: std::result::Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<Json<Cart>> {
    let Json(request) = body?;
    Ok(Json(state.carts().add_item(owner, request).await?))
}

/// Overwrite a line's quantity.
#[instrument(skip(state, product_id, body))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(owner): RequireAuth,
    product_id: std::result::Result<Path<ProductId>, PathRejection>,
    body: std::result::Result<Json<UpdateQuantityRequest>, JsonRejection>,
) -> Result<Json<Cart>> {
    let Path(product_id) = product_id?;
    let Json(request) = body?;
    Ok(Json(
        state
            .carts()
            .set_quantity(owner, product_id, request.quantity)
            .await?,
    ))
}

/// Remove a line.
#[instrument(skip(state, product_id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(owner): RequireAuth,
    product_id: std::result::Result<Path<ProductId>, PathRejection>,
) -> Result<Json<Cart>> {
    let Path(product_id) = product_id?;
    Ok(Json(state.carts().remove_item(owner, product_id).await?))
}

/// Empty the cart.
#[instrument(skip(state))]
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(owner): RequireAuth,
) -> Result<Json<Cart>> {
    Ok(Json(state.carts().clear(owner).await?))
}
