use crate::{
    db::DbPool,
    entities::{product, Product},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Catalog service owning product records. Mutation is admin-only at the
/// HTTP layer; `sold_count` is advanced exclusively by checkout settlement.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    pub category: String,
    pub description: String,
    pub stock: i32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub video: Option<String>,
}

/// Input for updating a product; absent fields are left unchanged
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub stock: Option<i32>,
    pub images: Option<Vec<String>>,
    pub video: Option<String>,
}

impl CatalogService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        validate_product_fields(&input.name, input.price, input.discount, &input.category, input.stock)?;
        if input.description.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "description is required".to_string(),
            ));
        }

        let now = Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            price: Set(input.price),
            discount: Set(input.discount),
            category: Set(input.category),
            description: Set(input.description),
            stock: Set(input.stock),
            sold_count: Set(0),
            images: Set(serde_json::json!(input.images)),
            video: Set(input.video),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = model.insert(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::ProductCreated(created.id))
            .await;
        info!(product_id = %created.id, "Product created");
        Ok(created)
    }

    /// Lists products, optionally filtered by category. "All" means no
    /// filter, matching the storefront's category selector.
    pub async fn list_products(
        &self,
        category: Option<String>,
    ) -> Result<Vec<product::Model>, ServiceError> {
        let mut query = Product::find().order_by_desc(product::Column::CreatedAt);
        if let Some(category) = category.filter(|c| c != "All") {
            query = query.filter(product::Column::Category.eq(category));
        }
        Ok(query.all(&*self.db).await?)
    }

    pub async fn get_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProductInput,
    ) -> Result<product::Model, ServiceError> {
        let existing = self.get_product(id).await?;

        let price = input.price.unwrap_or(existing.price);
        let discount = input.discount.unwrap_or(existing.discount);
        let name = input.name.unwrap_or_else(|| existing.name.clone());
        let category = input.category.unwrap_or_else(|| existing.category.clone());
        let stock = input.stock.unwrap_or(existing.stock);
        validate_product_fields(&name, price, discount, &category, stock)?;

        let mut active: product::ActiveModel = existing.into();
        active.name = Set(name);
        active.price = Set(price);
        active.discount = Set(discount);
        active.category = Set(category);
        active.stock = Set(stock);
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(images) = input.images {
            active.images = Set(serde_json::json!(images));
        }
        if let Some(video) = input.video {
            active.video = Set(Some(video));
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::ProductUpdated(updated.id))
            .await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get_product(id).await?;
        existing.delete(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductDeleted(id))
            .await;
        info!(product_id = %id, "Product deleted");
        Ok(())
    }
}

fn validate_product_fields(
    name: &str,
    price: Decimal,
    discount: Decimal,
    category: &str,
    stock: i32,
) -> Result<(), ServiceError> {
    if name.trim().is_empty() {
        return Err(ServiceError::ValidationError("name is required".to_string()));
    }
    if price <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "price must be greater than zero".to_string(),
        ));
    }
    if discount < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "discount cannot be negative".to_string(),
        ));
    }
    if category.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "category is required".to_string(),
        ));
    }
    if stock < 0 {
        return Err(ServiceError::ValidationError(
            "stock cannot be negative".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn field_validation_rejects_bad_values() {
        assert!(validate_product_fields("Diya", dec!(100), dec!(0), "Decor", 5).is_ok());
        assert!(validate_product_fields("", dec!(100), dec!(0), "Decor", 5).is_err());
        assert!(validate_product_fields("Diya", dec!(0), dec!(0), "Decor", 5).is_err());
        assert!(validate_product_fields("Diya", dec!(100), dec!(-1), "Decor", 5).is_err());
        assert!(validate_product_fields("Diya", dec!(100), dec!(0), " ", 5).is_err());
        assert!(validate_product_fields("Diya", dec!(100), dec!(0), "Decor", -1).is_err());
    }

    #[test]
    fn discount_above_price_is_allowed_but_inactive() {
        // Storage accepts it; pricing treats it as no discount.
        assert!(validate_product_fields("Diya", dec!(100), dec!(150), "Decor", 5).is_ok());
    }
}
