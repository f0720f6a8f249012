use crate::handlers::common::success_response;
use crate::{
    auth::AuthenticatedUser,
    errors::ServiceError,
    services::{CartLine, GatewayOrder, VerifyCallbackInput},
    AppState,
};
use axum::{
    extract::{Json, State},
    response::Response,
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

/// Creates the router for the checkout/payment endpoints.
pub fn payments_routes() -> Router<AppState> {
    Router::new()
        .route("/createorder", post(create_order))
        .route("/verify", post(verify_payment))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateOrderRequest {
    pub cart_items: Vec<CartLine>,
    /// Accepted for wire compatibility; the authenticated principal is what
    /// the intent is recorded against.
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

/// Open a gateway order for the caller's cart snapshot
#[utoipa::path(
    post,
    path = "/api/v1/payment/createorder",
    responses(
        (status = 200, description = "Gateway order opened", body = GatewayOrder),
        (status = 400, description = "Cart is empty", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment gateway unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn create_order(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Response, ServiceError> {
    let gateway_order = state
        .services
        .checkout
        .create_intent(user.id, payload.cart_items)
        .await?;
    Ok(success_response(json!({ "order": gateway_order })))
}

/// Verify the gateway callback signature and settle the order
#[utoipa::path(
    post,
    path = "/api/v1/payment/verify",
    responses(
        (status = 200, description = "Payment verified; order settled (idempotent on retries)"),
        (status = 400, description = "Invalid signature", body = crate::errors::ErrorResponse),
        (status = 404, description = "Payment intent not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn verify_payment(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<VerifyCallbackInput>,
) -> Result<Response, ServiceError> {
    let outcome = state.services.checkout.verify_and_settle(payload).await?;
    Ok(success_response(json!({
        "message": "Payment successful",
        "order": outcome.detail,
    })))
}
