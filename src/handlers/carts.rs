use crate::handlers::common::success_response;
use crate::{
    auth::AuthenticatedUser,
    errors::ServiceError,
    services::{AddToCartInput, QuantityAction, QuantityUpdate},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

/// Creates the router for cart endpoints. Every route is scoped to the
/// authenticated user.
pub fn carts_routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(add_to_cart))
        .route("/", get(get_cart))
        .route("/update/{id}", put(update_quantity))
        .route("/remove/{id}", delete(remove_item))
        .route("/clear", delete(clear_cart))
}

async fn add_to_cart(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<AddToCartInput>,
) -> Result<Response, ServiceError> {
    let item = state.services.cart.add_item(user.id, payload).await?;
    Ok(success_response(json!({
        "message": "Added to cart",
        "cart": item,
    })))
}

async fn get_cart(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Response, ServiceError> {
    let items = state.services.cart.list_items(user.id).await?;
    Ok(success_response(json!({ "cart": items })))
}

#[derive(Debug, Deserialize)]
struct UpdateQuantityRequest {
    action: QuantityAction,
}

async fn update_quantity(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Result<Response, ServiceError> {
    match state
        .services
        .cart
        .update_quantity(user.id, id, payload.action)
        .await?
    {
        QuantityUpdate::Updated(item) => Ok(success_response(json!({
            "message": "Quantity updated",
            "item": item,
        }))),
        QuantityUpdate::Removed => Ok(success_response(json!({ "message": "Item removed" }))),
    }
}

async fn remove_item(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.cart.remove_item(user.id, id).await?;
    Ok(success_response(json!({ "message": "Item removed" })))
}

async fn clear_cart(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Response, ServiceError> {
    state.services.cart.clear(user.id).await?;
    Ok(success_response(json!({ "message": "Cart cleared" })))
}
