use crate::handlers::common::{created_response, success_response};
use crate::{
    auth::AuthenticatedUser, errors::ServiceError, services::CreateOrderInput, AppState,
};
use axum::{
    extract::{Json, State},
    response::Response,
    routing::{get, post},
    Router,
};
use serde_json::json;

/// Creates the router for buyer-facing order endpoints.
pub fn orders_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_order))
        .route("/myorders", get(my_orders))
}

/// Idempotent client-side finalize: a resend for an already-settled gateway
/// order returns the existing order with 200 instead of 201.
async fn create_order(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderInput>,
) -> Result<Response, ServiceError> {
    let (detail, created) = state
        .services
        .order
        .create_idempotent(user.id, payload)
        .await?;

    if created {
        Ok(created_response(json!({
            "success": true,
            "order": detail,
        })))
    } else {
        Ok(success_response(json!({
            "success": true,
            "message": "Order already exists",
            "order": detail,
        })))
    }
}

async fn my_orders(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Response, ServiceError> {
    let orders = state.services.order.my_orders(user.id).await?;
    Ok(success_response(json!({
        "success": true,
        "orders": orders,
    })))
}
