use crate::handlers::common::{created_response, success_response};
use crate::{
    auth::{LoginInput, RegisterInput},
    errors::ServiceError,
    AppState,
};
use axum::{
    extract::{Json, State},
    response::Response,
    routing::post,
    Router,
};
use serde_json::json;

/// Creates the router for account endpoints.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterInput>,
) -> Result<Response, ServiceError> {
    let (token, user) = state.auth.register(payload).await?;
    Ok(created_response(json!({
        "message": "User registered successfully",
        "token": token,
        "user": user,
    })))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginInput>,
) -> Result<Response, ServiceError> {
    let (token, user) = state.auth.login(payload).await?;
    Ok(success_response(json!({
        "message": "Login successful",
        "token": token,
        "user": user,
    })))
}
