use crate::handlers::common::{created_response, success_response};
use crate::{
    auth::AdminUser,
    entities::product,
    errors::ServiceError,
    services::{CreateProductInput, UpdateProductInput},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::Response,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

/// Creates the router for catalog endpoints. Reads are public; mutation
/// requires the admin role.
pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
}

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub category: Option<String>,
}

/// Catalog read model, with computed pricing fields the storefront renders.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub discount: Decimal,
    pub effective_price: Decimal,
    pub discount_percentage: u32,
    pub category: String,
    pub description: String,
    pub stock: i32,
    pub sold_count: i32,
    pub images: Vec<String>,
    pub video: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<product::Model> for ProductResponse {
    fn from(model: product::Model) -> Self {
        Self {
            effective_price: model.effective_price(),
            discount_percentage: model.discount_percentage(),
            images: model.image_urls(),
            id: model.id,
            name: model.name,
            price: model.price,
            discount: model.discount,
            category: model.category,
            description: model.description,
            stock: model.stock,
            sold_count: model.sold_count,
            video: model.video,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// List products, optionally filtered by category ("All" disables the filter)
#[utoipa::path(
    get,
    path = "/api/v1/products",
    responses(
        (status = 200, description = "Product list", body = [ProductResponse])
    ),
    tag = "Catalog"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<Response, ServiceError> {
    let products = state.services.catalog.list_products(query.category).await?;
    let products: Vec<ProductResponse> = products.into_iter().map(ProductResponse::from).collect();
    Ok(success_response(json!({ "products": products })))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let product = state.services.catalog.get_product(id).await?;
    Ok(success_response(
        json!({ "product": ProductResponse::from(product) }),
    ))
}

async fn create_product(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateProductInput>,
) -> Result<Response, ServiceError> {
    let created = state.services.catalog.create_product(payload).await?;
    Ok(created_response(json!({
        "message": "Product created successfully",
        "product": ProductResponse::from(created),
    })))
}

async fn update_product(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductInput>,
) -> Result<Response, ServiceError> {
    let updated = state.services.catalog.update_product(id, payload).await?;
    Ok(success_response(json!({
        "message": "Product updated",
        "product": ProductResponse::from(updated),
    })))
}

async fn delete_product(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.catalog.delete_product(id).await?;
    Ok(success_response(
        json!({ "message": "Product deleted successfully" }),
    ))
}
