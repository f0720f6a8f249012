use crate::{
    db::DbPool,
    entities::{order, Order, OrderItem},
    errors::ServiceError,
};
use rust_decimal::Decimal;
use sea_orm::EntityTrait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

/// Aggregate sales figures for the admin dashboard.
#[derive(Debug, Serialize)]
pub struct SalesReport {
    pub total_orders: usize,
    pub total_revenue: Decimal,
    pub units_sold: i64,
    /// Order counts keyed by lifecycle status
    pub orders_by_status: BTreeMap<String, usize>,
}

/// Read-only aggregation over order records. Dashboard scale, so the fold
/// happens in-process over plain queries.
#[derive(Clone)]
pub struct ReportService {
    db: Arc<DbPool>,
}

impl ReportService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn sales_report(&self) -> Result<SalesReport, ServiceError> {
        let orders = Order::find().all(&*self.db).await?;
        let items = OrderItem::find().all(&*self.db).await?;

        let total_orders = orders.len();
        let total_revenue: Decimal = orders.iter().map(|o| o.total_amount).sum();
        let units_sold: i64 = items.iter().map(|i| i64::from(i.quantity)).sum();

        let mut orders_by_status: BTreeMap<String, usize> = BTreeMap::new();
        for order_model in &orders {
            *orders_by_status
                .entry(order_status_label(order_model).to_string())
                .or_default() += 1;
        }

        Ok(SalesReport {
            total_orders,
            total_revenue,
            units_sold,
            orders_by_status,
        })
    }
}

fn order_status_label(order_model: &order::Model) -> &'static str {
    order_model.status.as_str()
}
