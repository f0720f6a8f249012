use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Catalog product. `sold_count` is only ever advanced by checkout
/// settlement; everything else is owned by the admin surface.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub discount: Decimal,
    pub category: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub stock: i32,
    pub sold_count: i32,
    /// Media URLs, first entry is the primary image
    #[sea_orm(column_type = "Json")]
    pub images: Json,
    pub video: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::review::Entity")]
    Reviews,
}

impl Related<super::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviews.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// A discount only applies while it undercuts the list price.
    pub fn discount_active(&self) -> bool {
        self.discount > Decimal::ZERO && self.discount < self.price
    }

    /// The price actually charged: discount price when valid, list price
    /// otherwise.
    pub fn effective_price(&self) -> Decimal {
        if self.discount_active() {
            self.discount
        } else {
            self.price
        }
    }

    /// Percentage off the list price, rounded to the nearest integer; 0 when
    /// no discount is active.
    pub fn discount_percentage(&self) -> u32 {
        if !self.discount_active() || self.price.is_zero() {
            return 0;
        }
        let pct = (self.price - self.discount) / self.price * Decimal::from(100);
        pct.round().to_u32().unwrap_or(0)
    }

    /// Media URLs decoded from the JSON column.
    pub fn image_urls(&self) -> Vec<String> {
        serde_json::from_value(self.images.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(price: Decimal, discount: Decimal) -> Model {
        Model {
            id: Uuid::new_v4(),
            name: "Brass Diya".to_string(),
            price,
            discount,
            category: "Decor".to_string(),
            description: "Hand-cast brass oil lamp".to_string(),
            stock: 10,
            sold_count: 0,
            images: serde_json::json!(["https://cdn.example/diya.jpg"]),
            video: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn effective_price_uses_active_discount() {
        let p = product(dec!(500), dec!(400));
        assert!(p.discount_active());
        assert_eq!(p.effective_price(), dec!(400));
    }

    #[test]
    fn effective_price_falls_back_to_list_price() {
        // No discount at all
        let p = product(dec!(200), Decimal::ZERO);
        assert!(!p.discount_active());
        assert_eq!(p.effective_price(), dec!(200));

        // Discount equal to price is not a discount
        let p = product(dec!(200), dec!(200));
        assert!(!p.discount_active());
        assert_eq!(p.effective_price(), dec!(200));

        // Discount above price is ignored
        let p = product(dec!(200), dec!(250));
        assert_eq!(p.effective_price(), dec!(200));
    }

    #[test]
    fn discount_percentage_rounds_to_nearest() {
        let p = product(dec!(500), dec!(400));
        assert_eq!(p.discount_percentage(), 20);

        let p = product(dec!(300), dec!(200));
        // 33.33..% rounds down
        assert_eq!(p.discount_percentage(), 33);

        let p = product(dec!(200), Decimal::ZERO);
        assert_eq!(p.discount_percentage(), 0);
    }

    #[test]
    fn image_urls_decodes_json_column() {
        let p = product(dec!(100), Decimal::ZERO);
        assert_eq!(p.image_urls(), vec!["https://cdn.example/diya.jpg"]);
    }
}
