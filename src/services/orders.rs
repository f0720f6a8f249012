use crate::{
    db::DbPool,
    entities::{order, order_item, user, Order, OrderItem, User},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Line item supplied when an order is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    pub quantity: i32,
}

/// Input for the idempotent order-create operation.
#[derive(Debug, Deserialize)]
pub struct CreateOrderInput {
    pub items: Vec<OrderItemInput>,
    pub total_amount: Decimal,
    pub payment_id: String,
    /// Gateway order id: the idempotency anchor
    pub order_id: String,
}

/// Order joined with its line items and (where requested) the buyer.
#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer: Option<BuyerInfo>,
}

/// Buyer fields joined into order listings.
#[derive(Debug, Clone, Serialize)]
pub struct BuyerInfo {
    pub name: String,
    pub email: String,
    pub address: String,
}

impl From<&user::Model> for BuyerInfo {
    fn from(model: &user::Model) -> Self {
        Self {
            name: model.name.clone(),
            email: model.email.clone(),
            address: model.address.clone(),
        }
    }
}

/// Order persistence and lifecycle. Creation is insert-if-absent keyed on the
/// gateway order id; the unique index underneath is a backstop, not the
/// control flow.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Creates an order unless one already exists for the gateway order id,
    /// in which case the existing order is returned unchanged.
    #[instrument(skip(self, input), fields(user_id = %user_id, gateway_order_id = %input.order_id))]
    pub async fn create_idempotent(
        &self,
        user_id: Uuid,
        input: CreateOrderInput,
    ) -> Result<(OrderDetail, bool), ServiceError> {
        if input.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "items are required".to_string(),
            ));
        }

        if let Some(existing) = self.find_by_gateway_id(&input.order_id).await? {
            info!(order_id = %existing.order.id, "Order already exists; returning unchanged");
            return Ok((existing, false));
        }

        let detail = self
            .insert_order(
                user_id,
                &input.order_id,
                &input.payment_id,
                input.total_amount,
                &input.items,
            )
            .await?;

        Ok((detail, true))
    }

    /// Inserts the order row and its items in one transaction. Shared by the
    /// idempotent create endpoint and checkout settlement.
    pub(crate) async fn insert_order(
        &self,
        user_id: Uuid,
        gateway_order_id: &str,
        payment_id: &str,
        total_amount: Decimal,
        items: &[OrderItemInput],
    ) -> Result<OrderDetail, ServiceError> {
        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let txn = self.db.begin().await?;

        let order_model = order::ActiveModel {
            id: Set(order_id),
            gateway_order_id: Set(gateway_order_id.to_string()),
            user_id: Set(user_id),
            total_amount: Set(total_amount),
            payment_id: Set(payment_id.to_string()),
            status: Set(order::OrderStatus::Paid),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut item_models = Vec::with_capacity(items.len());
        for item in items {
            let model = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                name: Set(item.name.clone()),
                price: Set(item.price),
                image: Set(item.image.clone()),
                size: Set(item.size.clone().unwrap_or_default()),
                quantity: Set(item.quantity),
                is_rated: Set(false),
            }
            .insert(&txn)
            .await?;
            item_models.push(model);
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCreated(order_id))
            .await;
        info!(order_id = %order_id, item_count = item_models.len(), "Order created");

        Ok(OrderDetail {
            order: order_model,
            items: item_models,
            buyer: None,
        })
    }

    pub async fn find_by_gateway_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<OrderDetail>, ServiceError> {
        let Some(order_model) = Order::find()
            .filter(order::Column::GatewayOrderId.eq(gateway_order_id))
            .one(&*self.db)
            .await?
        else {
            return Ok(None);
        };

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_model.id))
            .all(&*self.db)
            .await?;

        Ok(Some(OrderDetail {
            order: order_model,
            items,
            buyer: None,
        }))
    }

    /// The caller's orders, newest first, with buyer contact joined.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn my_orders(&self, user_id: Uuid) -> Result<Vec<OrderDetail>, ServiceError> {
        let buyer = User::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .map(|model| BuyerInfo::from(&model));

        let rows = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .find_with_related(OrderItem)
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(order_model, items)| OrderDetail {
                order: order_model,
                items,
                buyer: buyer.clone(),
            })
            .collect())
    }

    /// Every order in the store, newest first, with buyers joined. Admin
    /// surface only.
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<OrderDetail>, ServiceError> {
        let rows = Order::find()
            .order_by_desc(order::Column::CreatedAt)
            .find_with_related(OrderItem)
            .all(&*self.db)
            .await?;

        let user_ids: Vec<Uuid> = rows.iter().map(|(o, _)| o.user_id).collect();
        let buyers: HashMap<Uuid, BuyerInfo> = User::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(&*self.db)
            .await?
            .iter()
            .map(|model| (model.id, BuyerInfo::from(model)))
            .collect();

        Ok(rows
            .into_iter()
            .map(|(order_model, items)| {
                let buyer = buyers.get(&order_model.user_id).cloned();
                OrderDetail {
                    order: order_model,
                    items,
                    buyer,
                }
            })
            .collect())
    }

    /// Advances the order lifecycle. Only Paid -> Delivered is exposed;
    /// anything else (including Cancelled) is rejected.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = %status))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        status: &str,
    ) -> Result<order::Model, ServiceError> {
        let new_status = order::OrderStatus::parse(status)
            .ok_or_else(|| ServiceError::InvalidStatus(format!("unknown status '{}'", status)))?;

        let existing = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let old_status = existing.status;
        if !old_status.can_transition_to(new_status) {
            warn!(
                old = old_status.as_str(),
                new = new_status.as_str(),
                "Rejected order status transition"
            );
            return Err(ServiceError::InvalidStatus(format!(
                "cannot move order from {} to {}",
                old_status.as_str(),
                new_status.as_str()
            )));
        }

        let mut active: order::ActiveModel = existing.into();
        active.status = Set(new_status);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: old_status.as_str().to_string(),
                new_status: new_status.as_str().to_string(),
            })
            .await;

        Ok(updated)
    }
}
