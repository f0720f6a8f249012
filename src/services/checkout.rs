use crate::{
    db::DbPool,
    entities::{cart_item, payment_intent, product, CartItem, PaymentIntent, Product, User},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        notifications::{EmailClient, OrderConfirmation},
        orders::{OrderDetail, OrderItemInput, OrderService},
        payment_gateway::{CallbackSignature, GatewayOrder, PaymentGateway},
    },
};
use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Cart line as submitted at checkout. The price is the client's display
/// snapshot; authoritative pricing is re-resolved from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CartLine {
    pub product_id: Uuid,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    pub quantity: i32,
}

/// Callback triple delivered by the gateway after the buyer pays.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct VerifyCallbackInput {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub gateway_signature: String,
}

/// Result of a verified callback.
#[derive(Debug)]
pub struct SettlementOutcome {
    pub detail: OrderDetail,
    /// False when a duplicate callback found the order already settled.
    pub settled_now: bool,
}

/// Orchestrates the checkout workflow:
///
/// ```text
/// IDLE -> INTENT_CREATED -> VERIFIED -> SETTLED
///                  \ (signature mismatch) -> REJECTED (terminal)
/// ```
///
/// Intent creation is freely re-entrant (each attempt opens its own gateway
/// order under a fresh receipt). The single correctness-critical idempotence
/// boundary is order creation keyed on the gateway order id.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DbPool>,
    gateway: Arc<PaymentGateway>,
    signature: CallbackSignature,
    mailer: Arc<EmailClient>,
    orders: Arc<OrderService>,
    event_sender: EventSender,
    currency: String,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DbPool>,
        gateway: Arc<PaymentGateway>,
        signature: CallbackSignature,
        mailer: Arc<EmailClient>,
        orders: Arc<OrderService>,
        event_sender: EventSender,
        currency: String,
    ) -> Self {
        Self {
            db,
            gateway,
            signature,
            mailer,
            orders,
            event_sender,
            currency,
        }
    }

    /// Step 1: price the cart authoritatively, open a gateway order, and
    /// persist the pending intent. Nothing is persisted if the gateway call
    /// fails.
    #[instrument(skip(self, lines), fields(user_id = %user_id, line_count = lines.len()))]
    pub async fn create_intent(
        &self,
        user_id: Uuid,
        lines: Vec<CartLine>,
    ) -> Result<GatewayOrder, ServiceError> {
        if lines.is_empty() {
            return Err(ServiceError::ValidationError("Cart is empty".to_string()));
        }
        if lines.iter().any(|line| line.quantity < 1) {
            return Err(ServiceError::ValidationError(
                "line quantity must be at least 1".to_string(),
            ));
        }

        let total = self.authoritative_total(&lines).await?;
        let amount = to_minor_units(total)?;

        // The receipt is the idempotency key towards the gateway: one per
        // attempt, never derived from the cart, so a retried checkout opens a
        // fresh gateway order rather than colliding with a stale one.
        let receipt = format!("rcpt_{}", Uuid::new_v4().simple());
        let gateway_order = self
            .gateway
            .create_order(amount, &self.currency, &receipt)
            .await?;

        let products = serde_json::to_value(&lines)
            .map_err(|e| ServiceError::SerializationError(e.to_string()))?;
        let now = Utc::now();
        payment_intent::ActiveModel {
            id: Set(gateway_order.id.clone()),
            user_id: Set(user_id),
            products: Set(products),
            amount: Set(amount),
            currency: Set(self.currency.clone()),
            status: Set(payment_intent::PaymentIntentStatus::Created),
            payment_id: Set(None),
            signature: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        self.event_sender
            .send_or_log(Event::CheckoutStarted {
                user_id,
                gateway_order_id: gateway_order.id.clone(),
            })
            .await;

        info!(gateway_order_id = %gateway_order.id, amount = amount, "Payment intent created");
        Ok(gateway_order)
    }

    /// Steps 2 and 3: verify the callback signature, then settle. A mismatch
    /// fails closed with nothing mutated; a duplicate callback returns the
    /// already-settled order without repeating side effects.
    #[instrument(skip(self, input), fields(gateway_order_id = %input.gateway_order_id))]
    pub async fn verify_and_settle(
        &self,
        input: VerifyCallbackInput,
    ) -> Result<SettlementOutcome, ServiceError> {
        if !self.signature.verify(
            &input.gateway_order_id,
            &input.gateway_payment_id,
            &input.gateway_signature,
        ) {
            warn!("Callback signature mismatch");
            return Err(ServiceError::InvalidSignature);
        }

        let intent = PaymentIntent::find_by_id(input.gateway_order_id.clone())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Payment not found".to_string()))?;

        self.event_sender
            .send_or_log(Event::PaymentVerified {
                gateway_order_id: intent.id.clone(),
            })
            .await;

        // Idempotence boundary: a duplicate delivery finds the order and
        // stops before any further side effect.
        if let Some(existing) = self.orders.find_by_gateway_id(&intent.id).await? {
            info!(order_id = %existing.order.id, "Duplicate settlement; returning existing order");
            return Ok(SettlementOutcome {
                detail: existing,
                settled_now: false,
            });
        }

        let lines: Vec<CartLine> = serde_json::from_value(intent.products.clone())
            .map_err(|e| ServiceError::SerializationError(e.to_string()))?;

        // Mark the intent paid, then cut the durable order (order + items in
        // one transaction inside OrderService). Intent state is recorded
        // first so a crash in between leaves a paid intent that a retried
        // callback can settle.
        let user_id = intent.user_id;
        let total_amount = Decimal::from(intent.amount) / Decimal::from(100);
        let mut intent_active: payment_intent::ActiveModel = intent.into();
        intent_active.status = Set(payment_intent::PaymentIntentStatus::Paid);
        intent_active.payment_id = Set(Some(input.gateway_payment_id.clone()));
        intent_active.signature = Set(Some(input.gateway_signature.clone()));
        intent_active.updated_at = Set(Utc::now());
        let intent = intent_active.update(&*self.db).await?;

        let items: Vec<OrderItemInput> = lines
            .iter()
            .map(|line| OrderItemInput {
                product_id: line.product_id,
                name: line.name.clone(),
                price: line.price,
                image: line.image.clone(),
                size: line.size.clone(),
                quantity: line.quantity,
            })
            .collect();

        let detail = self
            .orders
            .insert_order(
                user_id,
                &intent.id,
                &input.gateway_payment_id,
                total_amount,
                &items,
            )
            .await?;

        CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?;
        self.event_sender
            .send_or_log(Event::CartCleared(user_id))
            .await;

        // The order row is the durable commitment point. Everything below is
        // best-effort and must never fail the settlement.
        self.increment_sold_counts(&lines).await;
        self.dispatch_confirmations(user_id, &detail);

        info!(order_id = %detail.order.id, "Checkout settled");
        Ok(SettlementOutcome {
            detail,
            settled_now: true,
        })
    }

    /// Re-resolves each line against the catalog: active discount price,
    /// else list price, else the cart snapshot when the product has vanished
    /// (stale-price tolerance, logged rather than silent).
    async fn authoritative_total(&self, lines: &[CartLine]) -> Result<Decimal, ServiceError> {
        let mut total = Decimal::ZERO;
        for line in lines {
            let unit_price = match Product::find_by_id(line.product_id).one(&*self.db).await? {
                Some(catalog_product) => catalog_product.effective_price(),
                None => {
                    warn!(
                        product_id = %line.product_id,
                        snapshot_price = %line.price,
                        "Product missing at checkout; charging cart snapshot price"
                    );
                    line.price
                }
            };
            total += unit_price * Decimal::from(line.quantity);
        }
        Ok(total)
    }

    /// Advances sold counters after commit. Failures are logged and
    /// swallowed: a missed counter must never roll back a completed payment.
    async fn increment_sold_counts(&self, lines: &[CartLine]) {
        for line in lines {
            let result = Product::update_many()
                .col_expr(
                    product::Column::SoldCount,
                    Expr::col(product::Column::SoldCount).add(line.quantity),
                )
                .filter(product::Column::Id.eq(line.product_id))
                .exec(&*self.db)
                .await;

            if let Err(e) = result {
                error!(
                    product_id = %line.product_id,
                    "Failed to increment sold count: {}",
                    e
                );
            }
        }
    }

    /// Fires confirmation emails to the buyer and the operational inbox as a
    /// detached task. Failures land in the log sink only.
    fn dispatch_confirmations(&self, user_id: Uuid, detail: &OrderDetail) {
        let mailer = self.mailer.clone();
        let db = self.db.clone();
        let currency = self.currency.clone();
        let order_id = detail.order.gateway_order_id.clone();
        let total_amount = detail.order.total_amount;
        let item_lines: Vec<String> = detail
            .items
            .iter()
            .map(|item| format!("{} x{}", item.name, item.quantity))
            .collect();

        tokio::spawn(async move {
            let buyer = match User::find_by_id(user_id).one(&*db).await {
                Ok(Some(buyer)) => buyer,
                Ok(None) => {
                    warn!(user_id = %user_id, "Buyer not found; skipping confirmation email");
                    return;
                }
                Err(e) => {
                    warn!(user_id = %user_id, "Buyer lookup failed for confirmation email: {}", e);
                    return;
                }
            };

            let confirmation = OrderConfirmation {
                buyer_name: buyer.name.clone(),
                buyer_email: buyer.email.clone(),
                order_id,
                total_amount: format!("{} {}", total_amount, currency),
                item_lines,
            };

            if let Err(e) = mailer
                .send(
                    &buyer.email,
                    &confirmation.subject(),
                    &confirmation.buyer_html(),
                )
                .await
            {
                warn!("Buyer confirmation email failed: {}", e);
            }
            if let Err(e) = mailer
                .send(
                    &mailer.order_notify_address,
                    &confirmation.subject(),
                    &confirmation.operations_html(),
                )
                .await
            {
                warn!("Operations confirmation email failed: {}", e);
            }
        });
    }
}

/// Converts a major-unit total to minor currency units (two decimal places).
fn to_minor_units(total: Decimal) -> Result<i64, ServiceError> {
    if total < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "total cannot be negative".to_string(),
        ));
    }
    (total * Decimal::from(100))
        .round()
        .to_i64()
        .ok_or_else(|| ServiceError::ValidationError("total too large".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn minor_units_scales_by_hundred() {
        assert_eq!(to_minor_units(dec!(1000)).unwrap(), 100_000);
        assert_eq!(to_minor_units(dec!(0)).unwrap(), 0);
        assert_eq!(to_minor_units(dec!(19.99)).unwrap(), 1_999);
    }

    #[test]
    fn minor_units_rounds_fractional_paise() {
        assert_eq!(to_minor_units(dec!(10.006)).unwrap(), 1_001);
        assert_eq!(to_minor_units(dec!(10.004)).unwrap(), 1_000);
    }

    #[test]
    fn minor_units_rejects_negative_totals() {
        assert!(to_minor_units(dec!(-1)).is_err());
    }
}
