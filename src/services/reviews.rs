use crate::{
    db::DbPool,
    entities::{order_item, review, Order, OrderItem, Review, User},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Input for adding a review
#[derive(Debug, Deserialize)]
pub struct AddReviewInput {
    pub product_id: Uuid,
    pub order_item_id: Uuid,
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Review joined with its author for product pages.
#[derive(Debug, Serialize)]
pub struct ReviewWithAuthor {
    #[serde(flatten)]
    pub review: review::Model,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
}

/// Per-product review rollup.
#[derive(Debug, Serialize)]
pub struct ProductReviews {
    pub reviews: Vec<ReviewWithAuthor>,
    /// Mean rating rounded to one decimal; 0 when there are no reviews
    pub average_rating: f64,
    pub total_reviews: usize,
}

/// Review store: one review per purchased line item per buyer, rolled up
/// into a per-product average on read.
#[derive(Clone)]
pub struct ReviewService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl ReviewService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Records a review and flips the order item's `is_rated` flag, both in
    /// one transaction. A second review for the same line item is rejected.
    #[instrument(skip(self, input), fields(user_id = %user_id, order_item_id = %input.order_item_id))]
    pub async fn add_review(
        &self,
        user_id: Uuid,
        input: AddReviewInput,
    ) -> Result<review::Model, ServiceError> {
        if !(1..=5).contains(&input.rating) {
            return Err(ServiceError::ValidationError(
                "rating must be between 1 and 5".to_string(),
            ));
        }

        let item = OrderItem::find_by_id(input.order_item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order item {} not found", input.order_item_id))
            })?;

        let parent_order = Order::find_by_id(item.order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;
        if parent_order.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "order item belongs to another buyer".to_string(),
            ));
        }

        let existing = Review::find()
            .filter(review::Column::OrderItemId.eq(input.order_item_id))
            .filter(review::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::DuplicateError(
                "You already reviewed this item".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let created = review::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(input.product_id),
            user_id: Set(user_id),
            order_item_id: Set(input.order_item_id),
            rating: Set(input.rating),
            comment: Set(input.comment),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        // is_rated flips false -> true exactly once, only on this path.
        let mut item_active: order_item::ActiveModel = item.into();
        item_active.is_rated = Set(true);
        item_active.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::ReviewAdded {
                product_id: created.product_id,
                review_id: created.id,
            })
            .await;
        info!(review_id = %created.id, rating = created.rating, "Review added");
        Ok(created)
    }

    /// All reviews for a product with the rating rollup. The average is 0
    /// (not null) for a product with no reviews.
    pub async fn product_reviews(&self, product_id: Uuid) -> Result<ProductReviews, ServiceError> {
        let rows = Review::find()
            .filter(review::Column::ProductId.eq(product_id))
            .order_by_desc(review::Column::CreatedAt)
            .find_also_related(User)
            .all(&*self.db)
            .await?;

        let total_reviews = rows.len();
        let average_rating = if total_reviews == 0 {
            0.0
        } else {
            let sum: i32 = rows.iter().map(|(r, _)| r.rating).sum();
            round1(f64::from(sum) / total_reviews as f64)
        };

        let reviews = rows
            .into_iter()
            .map(|(review_model, author)| ReviewWithAuthor {
                review: review_model,
                author_name: author.as_ref().map(|a| a.name.clone()),
                author_email: author.as_ref().map(|a| a.email.clone()),
            })
            .collect();

        Ok(ProductReviews {
            reviews,
            average_rating,
            total_reviews,
        })
    }

    /// The caller's own reviews, newest first.
    pub async fn user_reviews(&self, user_id: Uuid) -> Result<Vec<review::Model>, ServiceError> {
        Ok(Review::find()
            .filter(review::Column::UserId.eq(user_id))
            .order_by_desc(review::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
