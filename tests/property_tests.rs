use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use storefront_api::entities::product;
use uuid::Uuid;

fn product_with(price: i64, discount: i64) -> product::Model {
    let now = Utc::now();
    product::Model {
        id: Uuid::new_v4(),
        name: "Prop Product".to_string(),
        price: Decimal::from(price),
        discount: Decimal::from(discount),
        category: "Decor".to_string(),
        description: "property test fixture".to_string(),
        stock: 1,
        sold_count: 0,
        images: serde_json::json!([]),
        video: None,
        created_at: now,
        updated_at: now,
    }
}

proptest! {
    /// Effective price is the discount iff 0 < discount < price, else the
    /// list price.
    #[test]
    fn effective_price_selects_correctly(price in 1i64..1_000_000, discount in 0i64..2_000_000) {
        let model = product_with(price, discount);
        let expected = if discount > 0 && discount < price {
            Decimal::from(discount)
        } else {
            Decimal::from(price)
        };
        prop_assert_eq!(model.effective_price(), expected);
    }

    /// The effective price never exceeds the list price.
    #[test]
    fn effective_price_never_exceeds_list(price in 1i64..1_000_000, discount in 0i64..2_000_000) {
        let model = product_with(price, discount);
        prop_assert!(model.effective_price() <= model.price);
    }

    /// Discount percentage stays within 0..=100 and is zero exactly when the
    /// discount is inactive.
    #[test]
    fn discount_percentage_bounds(price in 1i64..1_000_000, discount in 0i64..2_000_000) {
        let model = product_with(price, discount);
        let pct = model.discount_percentage();
        prop_assert!(pct <= 100);
        if !(discount > 0 && discount < price) {
            prop_assert_eq!(pct, 0);
        }
    }
}
