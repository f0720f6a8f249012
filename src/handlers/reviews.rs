use crate::handlers::common::{created_response, success_response};
use crate::{
    auth::AuthenticatedUser, errors::ServiceError, services::AddReviewInput, AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::Response,
    routing::{get, post},
    Router,
};
use serde_json::json;
use uuid::Uuid;

/// Creates the router for review endpoints.
pub fn reviews_routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(add_review))
        .route("/productreview/{product_id}", get(product_reviews))
        .route("/myreviews", get(my_reviews))
}

async fn add_review(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<AddReviewInput>,
) -> Result<Response, ServiceError> {
    let review = state.services.review.add_review(user.id, payload).await?;
    Ok(created_response(json!({
        "success": true,
        "message": "Review added successfully",
        "review": review,
    })))
}

async fn product_reviews(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let rollup = state.services.review.product_reviews(product_id).await?;
    Ok(success_response(json!({
        "success": true,
        "reviews": rollup.reviews,
        "averageRating": rollup.average_rating,
        "totalReviews": rollup.total_reviews,
    })))
}

async fn my_reviews(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Response, ServiceError> {
    let reviews = state.services.review.user_reviews(user.id).await?;
    Ok(success_response(json!({
        "success": true,
        "reviews": reviews,
    })))
}
