//! Order route handlers.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use tracing::instrument;

use emporium_core::api::CreateOrderRequest;
use emporium_core::{Order, OrderId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Place an order from the current cart.
#[instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(owner): RequireAuth,
    body: std::result::Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>)> {
    let Json(request) = body?;
    let order = state.carts().create_order(owner, request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Order history.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(owner): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.carts().list_orders(owner).await?))
}

/// A single order.
#[instrument(skip(state, id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(owner): RequireAuth,
    id: std::result::Result<Path<OrderId>, PathRejection>,
) -> Result<Json<Order>> {
    let Path(id) = id?;
    Ok(Json(state.carts().get_order(owner, id).await?))
}
