mod common;

use assert_matches::assert_matches;
use common::TestApp;
use rust_decimal_macros::dec;
use storefront_api::{
    errors::ServiceError,
    services::{AddToCartInput, QuantityAction, QuantityUpdate},
};
use uuid::Uuid;

fn add_input(product_id: Uuid, size: Option<&str>, quantity: i32) -> AddToCartInput {
    AddToCartInput {
        product_id,
        name: "Brass Diya".to_string(),
        price: dec!(500),
        image: Some("https://cdn.example/diya.jpg".to_string()),
        size: size.map(|s| s.to_string()),
        quantity,
    }
}

#[tokio::test]
async fn duplicate_adds_merge_into_one_row() {
    let app = TestApp::new().await;
    let (_, user) = app.register_user("asha", None).await;
    let cart = &app.state.services.cart;
    let product_id = Uuid::new_v4();

    let first = cart
        .add_item(user.id, add_input(product_id, Some("M"), 2))
        .await
        .expect("first add");
    assert_eq!(first.quantity, 2);

    let merged = cart
        .add_item(user.id, add_input(product_id, Some("M"), 3))
        .await
        .expect("second add");
    assert_eq!(merged.quantity, 5);

    let items = cart.list_items(user.id).await.expect("list");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 5);
}

#[tokio::test]
async fn different_sizes_stay_separate_rows() {
    let app = TestApp::new().await;
    let (_, user) = app.register_user("asha", None).await;
    let cart = &app.state.services.cart;
    let product_id = Uuid::new_v4();

    cart.add_item(user.id, add_input(product_id, Some("M"), 1))
        .await
        .expect("add M");
    cart.add_item(user.id, add_input(product_id, Some("L"), 1))
        .await
        .expect("add L");
    // No size normalizes to its own key as well
    cart.add_item(user.id, add_input(product_id, None, 1))
        .await
        .expect("add unsized");

    let items = cart.list_items(user.id).await.expect("list");
    assert_eq!(items.len(), 3);
}

#[tokio::test]
async fn add_rejects_missing_fields() {
    let app = TestApp::new().await;
    let (_, user) = app.register_user("asha", None).await;
    let cart = &app.state.services.cart;

    let mut input = add_input(Uuid::new_v4(), None, 1);
    input.name = "".to_string();
    assert_matches!(
        cart.add_item(user.id, input).await,
        Err(ServiceError::ValidationError(_))
    );

    let mut input = add_input(Uuid::new_v4(), None, 1);
    input.price = dec!(0);
    assert_matches!(
        cart.add_item(user.id, input).await,
        Err(ServiceError::ValidationError(_))
    );

    let input = add_input(Uuid::new_v4(), None, 0);
    assert_matches!(
        cart.add_item(user.id, input).await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn decrease_on_quantity_one_deletes_the_row() {
    let app = TestApp::new().await;
    let (_, user) = app.register_user("asha", None).await;
    let cart = &app.state.services.cart;

    let item = cart
        .add_item(user.id, add_input(Uuid::new_v4(), None, 2))
        .await
        .expect("add");

    // 2 -> 1
    let updated = cart
        .update_quantity(user.id, item.id, QuantityAction::Decrease)
        .await
        .expect("decrease");
    let updated = match updated {
        QuantityUpdate::Updated(model) => model,
        QuantityUpdate::Removed => panic!("row should survive at quantity 1"),
    };
    assert_eq!(updated.quantity, 1);

    // 1 -> removed, never persisted at zero
    let removed = cart
        .update_quantity(user.id, item.id, QuantityAction::Decrease)
        .await
        .expect("decrease to zero");
    assert_matches!(removed, QuantityUpdate::Removed);
    assert!(cart.list_items(user.id).await.expect("list").is_empty());
}

#[tokio::test]
async fn increase_increments_by_one() {
    let app = TestApp::new().await;
    let (_, user) = app.register_user("asha", None).await;
    let cart = &app.state.services.cart;

    let item = cart
        .add_item(user.id, add_input(Uuid::new_v4(), None, 1))
        .await
        .expect("add");

    let updated = cart
        .update_quantity(user.id, item.id, QuantityAction::Increase)
        .await
        .expect("increase");
    assert_matches!(updated, QuantityUpdate::Updated(model) if model.quantity == 2);
}

#[tokio::test]
async fn quantity_update_enforces_ownership() {
    let app = TestApp::new().await;
    let (_, owner) = app.register_user("owner", None).await;
    let (_, intruder) = app.register_user("intruder", None).await;
    let cart = &app.state.services.cart;

    let item = cart
        .add_item(owner.id, add_input(Uuid::new_v4(), None, 1))
        .await
        .expect("add");

    assert_matches!(
        cart.update_quantity(intruder.id, item.id, QuantityAction::Increase)
            .await,
        Err(ServiceError::Forbidden(_))
    );
    assert_matches!(
        cart.remove_item(intruder.id, item.id).await,
        Err(ServiceError::Forbidden(_))
    );

    // Unknown row is NotFound, not Forbidden
    assert_matches!(
        cart.update_quantity(owner.id, Uuid::new_v4(), QuantityAction::Increase)
            .await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn clear_only_touches_the_callers_rows() {
    let app = TestApp::new().await;
    let (_, asha) = app.register_user("asha", None).await;
    let (_, ravi) = app.register_user("ravi", None).await;
    let cart = &app.state.services.cart;

    cart.add_item(asha.id, add_input(Uuid::new_v4(), None, 1))
        .await
        .expect("add asha");
    cart.add_item(ravi.id, add_input(Uuid::new_v4(), None, 1))
        .await
        .expect("add ravi");

    cart.clear(asha.id).await.expect("clear");

    assert!(cart.list_items(asha.id).await.expect("list").is_empty());
    assert_eq!(cart.list_items(ravi.id).await.expect("list").len(), 1);
}
