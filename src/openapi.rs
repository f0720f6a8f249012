use crate::AppState;
use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

/// OpenAPI document for the public surface. Only the endpoints clients
/// integrate against programmatically are annotated; the rest of the API is
/// documented by the route table.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "storefront-api",
        description = "Catalog, cart, checkout, order, and review API for the storefront"
    ),
    paths(
        crate::handlers::products::list_products,
        crate::handlers::payments::create_order,
        crate::handlers::payments::verify_payment,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::services::payment_gateway::GatewayOrder,
        crate::handlers::products::ProductResponse,
    )),
    tags(
        (name = "Catalog", description = "Product catalog"),
        (name = "Payments", description = "Checkout and payment verification")
    )
)]
pub struct ApiDoc;

/// Serves the generated document as JSON.
pub fn openapi_routes() -> Router<AppState> {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}
