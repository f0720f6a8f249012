pub mod admin;
pub mod carts;
pub mod common;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reviews;
pub mod users;

use crate::{
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    services::{
        CallbackSignature, CartService, CatalogService, CheckoutService, EmailClient,
        OrderService, PaymentGateway, ReportService, ReviewService,
    },
};
use std::sync::Arc;

/// Services layer that encapsulates business logic used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub cart: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub order: Arc<OrderService>,
    pub review: Arc<ReviewService>,
    pub report: Arc<ReportService>,
}

impl AppServices {
    /// Builds the service container. The gateway, signature verifier, and
    /// mailer are constructed once here and injected, so no service reaches
    /// for process-wide state.
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, config: &AppConfig) -> Self {
        let gateway = Arc::new(PaymentGateway::new(&config.gateway));
        let mailer = Arc::new(EmailClient::new(&config.email));
        let signature = CallbackSignature::new(config.gateway.key_secret.clone());

        let order = Arc::new(OrderService::new(db.clone(), event_sender.clone()));
        let checkout = Arc::new(CheckoutService::new(
            db.clone(),
            gateway,
            signature,
            mailer,
            order.clone(),
            event_sender.clone(),
            config.currency.clone(),
        ));

        Self {
            catalog: Arc::new(CatalogService::new(db.clone(), event_sender.clone())),
            cart: Arc::new(CartService::new(db.clone(), event_sender.clone())),
            checkout,
            order,
            review: Arc::new(ReviewService::new(db.clone(), event_sender)),
            report: Arc::new(ReportService::new(db)),
        }
    }
}
