use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use uuid::Uuid;

use crate::handlers::common::success_response;
use crate::{auth::AuthUser, errors::ServiceError, AppState};

/// Creates the router for customer-facing order endpoints.
pub fn orders_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(order_history))
        .route("/:id", get(get_order))
}

/// The authenticated customer's order history, newest first
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    responses(
        (status = 200, description = "Order history"),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn order_history(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let orders = state.services.orders.order_history(user.id).await?;
    Ok(success_response(orders))
}

/// A single order; owner or admin only
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    responses(
        (status = 200, description = "Order with items"),
        (status = 403, description = "Not the order's owner", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.get_order(id).await?;
    if order.order.customer_id != user.id && !user.is_admin() {
        return Err(ServiceError::Forbidden(
            "order belongs to another customer".to_string(),
        ));
    }
    Ok(success_response(order))
}
