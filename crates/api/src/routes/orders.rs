//! Order placement and fulfilment routes.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use larder_core::{OrderId, OrderStatus};

use crate::db::{OrderRepository, RepositoryError};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{RequireAdmin, RequireOwner};
use crate::models::{NewOrder, Order};
use crate::services::checkout::CheckoutService;
use crate::state::AppState;

use super::{JsonBody, parse_id};

const ORDER_MISSING: &str = "Order not found";

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub order: NewOrder,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub order: Order,
    /// Non-fatal problems, e.g. purchase history not recorded.
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    pub status: String,
}

/// Store an order for a payment the client already made.
///
/// POST /order/create/{user_id}
pub async fn create(
    State(state): State<AppState>,
    RequireOwner(user): RequireOwner,
    JsonBody(req): JsonBody<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>> {
    add_breadcrumb(
        "checkout",
        "Placing order",
        Some(&[("transaction_id", req.order.transaction_id.as_str())]),
    );

    let placed = CheckoutService::new(state.pool(), state.payments())
        .place(user.id, req.order)
        .await?;

    Ok(Json(CreateOrderResponse {
        order: placed.order,
        warnings: placed.warnings,
    }))
}

/// All orders, newest first.
///
/// GET /order/list/{user_id}
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(OrderRepository::new(state.pool()).list().await?))
}

/// GET /order/status-values/{user_id}
pub async fn status_values(RequireAdmin(_admin): RequireAdmin) -> Json<Vec<&'static str>> {
    Json(OrderStatus::ALL.iter().map(|s| s.as_str()).collect())
}

/// PUT /order/{order_id}/status/{user_id}
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path((order_id, _)): Path<(String, String)>,
    JsonBody(req): JsonBody<StatusRequest>,
) -> Result<Json<Order>> {
    let id: OrderId = parse_id(&order_id, ORDER_MISSING)?;
    let status: OrderStatus = req
        .status
        .parse()
        .map_err(|e: larder_core::UnknownStatus| AppError::BadRequest(e.to_string()))?;

    let order = OrderRepository::new(state.pool())
        .update_status(id, status)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::BadRequest(ORDER_MISSING.to_string()),
            other => other.into(),
        })?;

    tracing::info!(
        order_id = %id,
        status = status.as_str(),
        admin_id = %admin.id,
        "Order status updated"
    );
    Ok(Json(order))
}
