use crate::handlers::common::success_response;
use crate::{auth::AdminUser, errors::ServiceError, AppState};
use axum::{
    extract::{Json, Path, State},
    response::Response,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

/// Creates the router for the admin surface. Every handler requires the
/// admin role via the AdminUser extractor.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/fetchadmin", get(list_orders))
        .route("/update-status/{id}", put(update_status))
        .route("/report", get(sales_report))
}

async fn list_orders(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> Result<Response, ServiceError> {
    let orders = state.services.order.list_all().await?;
    Ok(success_response(json!({
        "success": true,
        "orders": orders,
    })))
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    status: String,
}

async fn update_status(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Response, ServiceError> {
    let updated = state
        .services
        .order
        .update_status(id, &payload.status)
        .await?;
    Ok(success_response(json!({
        "success": true,
        "order": updated,
    })))
}

async fn sales_report(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> Result<Response, ServiceError> {
    let report = state.services.report.sales_report().await?;
    Ok(success_response(json!({
        "success": true,
        "report": report,
    })))
}
