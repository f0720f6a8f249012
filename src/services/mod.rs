pub mod carts;
pub mod catalog;
pub mod checkout;
pub mod notifications;
pub mod orders;
pub mod payment_gateway;
pub mod reports;
pub mod reviews;

pub use carts::{AddToCartInput, CartService, QuantityAction, QuantityUpdate};
pub use catalog::{CatalogService, CreateProductInput, UpdateProductInput};
pub use checkout::{CartLine, CheckoutService, SettlementOutcome, VerifyCallbackInput};
pub use notifications::EmailClient;
pub use orders::{CreateOrderInput, OrderDetail, OrderItemInput, OrderService};
pub use payment_gateway::{CallbackSignature, GatewayOrder, PaymentGateway};
pub use reports::{ReportService, SalesReport};
pub use reviews::{AddReviewInput, ProductReviews, ReviewService};
