use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::handlers::common::success_response;
use crate::{auth::AuthUser, errors::ServiceError, AppState};

/// Creates the router for the admin surface. Every handler re-checks the
/// admin role on the extracted user.
pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/:id/status", put(update_order_status))
        .route("/dashboard", get(dashboard))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// All orders, newest first (admin)
#[utoipa::path(
    get,
    path = "/api/v1/admin/orders",
    responses(
        (status = 200, description = "All orders"),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse)
    ),
    tag = "Admin"
)]
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;
    let orders = state.services.orders.list_all().await?;
    Ok(success_response(orders))
}

/// Transition an order's status (admin)
#[utoipa::path(
    put,
    path = "/api/v1/admin/orders/{id}/status",
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Order updated"),
        (status = 400, description = "Invalid status target", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;
    let order = state.services.orders.set_status(id, &payload.status).await?;
    Ok(success_response(order))
}

/// Dashboard statistics (admin)
#[utoipa::path(
    get,
    path = "/api/v1/admin/dashboard",
    responses(
        (status = 200, description = "Dashboard statistics", body = crate::services::analytics::DashboardStats),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse)
    ),
    tag = "Admin"
)]
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;
    let stats = state.services.analytics.dashboard_stats().await?;
    Ok(success_response(stats))
}
