use crate::{
    db::DbPool,
    entities::{cart_item, CartItem},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Per-user shopping cart. One row per (user, product, size); duplicate adds
/// merge into the existing row through a single atomic upsert, so two
/// concurrent adds can never produce two rows.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

/// Input for adding an item to the cart
#[derive(Debug, Deserialize)]
pub struct AddToCartInput {
    pub product_id: Uuid,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

/// Quantity adjustment actions accepted by the cart endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantityAction {
    Increase,
    Decrease,
}

/// Result of a quantity update: either the surviving row or a removal.
#[derive(Debug)]
pub enum QuantityUpdate {
    Updated(cart_item::Model),
    Removed,
}

impl CartService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Adds an item, merging quantity into any existing (user, product, size)
    /// row in one statement.
    #[instrument(skip(self, input), fields(user_id = %user_id, product_id = %input.product_id))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        input: AddToCartInput,
    ) -> Result<cart_item::Model, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "name is required".to_string(),
            ));
        }
        if input.price <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "price must be greater than zero".to_string(),
            ));
        }
        if input.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "quantity must be at least 1".to_string(),
            ));
        }

        let now = Utc::now();
        let product_id = input.product_id;
        let model = cart_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            product_id: Set(product_id),
            name: Set(input.name),
            price: Set(input.price),
            image: Set(input.image),
            size: Set(input.size.unwrap_or_default()),
            quantity: Set(input.quantity),
            created_at: Set(now),
            updated_at: Set(now),
        };

        // Single atomic upsert: on key conflict the stored quantity is
        // incremented in-place, so concurrent adds merge instead of
        // duplicating rows.
        let on_conflict = OnConflict::columns([
            cart_item::Column::UserId,
            cart_item::Column::ProductId,
            cart_item::Column::Size,
        ])
        .value(
            cart_item::Column::Quantity,
            Expr::col((cart_item::Entity, cart_item::Column::Quantity)).add(input.quantity),
        )
        .value(cart_item::Column::UpdatedAt, Expr::value(now))
        .to_owned();

        let item = CartItem::insert(model)
            .on_conflict(on_conflict)
            .exec_with_returning(&*self.db)
            .await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                user_id,
                product_id,
            })
            .await;

        info!(item_id = %item.id, quantity = item.quantity, "Cart item upserted");
        Ok(item)
    }

    /// All cart rows for the user, oldest first. Display pricing is the
    /// caller's job; rows carry the snapshot taken at add time.
    pub async fn list_items(&self, user_id: Uuid) -> Result<Vec<cart_item::Model>, ServiceError> {
        Ok(CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Steps quantity by one in either direction. Decreasing a quantity-1 row
    /// deletes it: a non-positive quantity is never persisted.
    #[instrument(skip(self), fields(user_id = %user_id, item_id = %item_id))]
    pub async fn update_quantity(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        action: QuantityAction,
    ) -> Result<QuantityUpdate, ServiceError> {
        let item = self.owned_item(user_id, item_id).await?;

        match action {
            QuantityAction::Increase => {
                let quantity = item.quantity + 1;
                let mut active: cart_item::ActiveModel = item.into();
                active.quantity = Set(quantity);
                active.updated_at = Set(Utc::now());
                Ok(QuantityUpdate::Updated(active.update(&*self.db).await?))
            }
            QuantityAction::Decrease => {
                if item.quantity <= 1 {
                    item.delete(&*self.db).await?;
                    self.event_sender
                        .send_or_log(Event::CartItemRemoved { user_id, item_id })
                        .await;
                    Ok(QuantityUpdate::Removed)
                } else {
                    let quantity = item.quantity - 1;
                    let mut active: cart_item::ActiveModel = item.into();
                    active.quantity = Set(quantity);
                    active.updated_at = Set(Utc::now());
                    Ok(QuantityUpdate::Updated(active.update(&*self.db).await?))
                }
            }
        }
    }

    #[instrument(skip(self), fields(user_id = %user_id, item_id = %item_id))]
    pub async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<(), ServiceError> {
        let item = self.owned_item(user_id, item_id).await?;
        item.delete(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved { user_id, item_id })
            .await;
        Ok(())
    }

    /// Removes every row owned by the user.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn clear(&self, user_id: Uuid) -> Result<(), ServiceError> {
        CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?;

        self.event_sender
            .send_or_log(Event::CartCleared(user_id))
            .await;
        info!("Cart cleared");
        Ok(())
    }

    /// Fetches a row and enforces ownership: unknown id is NotFound, someone
    /// else's row is Forbidden.
    async fn owned_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
    ) -> Result<cart_item::Model, ServiceError> {
        let item = CartItem::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", item_id)))?;

        if item.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "cart item belongs to another user".to_string(),
            ));
        }
        Ok(item)
    }
}
