use std::sync::Arc;

use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::handlers::common::{success_response, validate_input};
use crate::{
    auth::AuthUser, errors::ServiceError, services::checkout::ShippingAddress, AppState,
};

/// Creates the router for checkout initiation.
pub fn checkout_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", post(initiate_checkout))
}

/// Creates the router for gateway payment confirmation. Mounted without
/// auth: the gateway calls it, and authenticity is established by the
/// HMAC signature instead of a session.
pub fn payments_routes() -> Router<Arc<AppState>> {
    Router::new().route("/verify", post(verify_payment))
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct CheckoutRequest {
    #[validate]
    pub shipping_address: ShippingAddress,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct VerifyPaymentRequest {
    #[validate(length(min = 1))]
    pub gateway_order_id: String,
    #[validate(length(min = 1))]
    pub gateway_payment_id: String,
    #[validate(length(min = 1))]
    pub signature: String,
}

/// Initiate checkout from the customer's cart
#[utoipa::path(
    post,
    path = "/api/v1/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Payment intent created", body = crate::services::checkout::CheckoutSummary),
        (status = 400, description = "Cart is empty", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment gateway failure", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn initiate_checkout(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let summary = state
        .services
        .checkout
        .initiate_checkout(user.id, payload.shipping_address)
        .await?;

    Ok(success_response(summary))
}

/// Verify a gateway payment confirmation
#[utoipa::path(
    post,
    path = "/api/v1/payments/verify",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment confirmed", body = crate::services::checkout::PaymentConfirmation),
        (status = 400, description = "Invalid signature", body = crate::errors::ErrorResponse),
        (status = 404, description = "No matching payment record", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn verify_payment(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VerifyPaymentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let confirmation = state
        .services
        .checkout
        .confirm_payment(
            &payload.gateway_order_id,
            &payload.gateway_payment_id,
            &payload.signature,
        )
        .await?;

    Ok(success_response(confirmation))
}
