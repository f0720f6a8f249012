mod common;

use assert_matches::assert_matches;
use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use storefront_api::{
    entities::OrderItem,
    errors::ServiceError,
    services::{AddReviewInput, CreateOrderInput, OrderItemInput},
};
use uuid::Uuid;

/// Settles a one-item order for the user and returns (product_id, order_item_id).
async fn settled_line(app: &TestApp, user_id: Uuid, product_id: Uuid) -> Uuid {
    let (detail, _) = app
        .state
        .services
        .order
        .create_idempotent(
            user_id,
            CreateOrderInput {
                items: vec![OrderItemInput {
                    product_id,
                    name: "Brass Diya".to_string(),
                    price: dec!(400),
                    image: None,
                    size: None,
                    quantity: 1,
                }],
                total_amount: dec!(400),
                payment_id: "pay_r".to_string(),
                order_id: format!("order_{}", Uuid::new_v4().simple()),
            },
        )
        .await
        .expect("order created");
    detail.items[0].id
}

#[tokio::test]
async fn review_flips_is_rated_exactly_once() {
    let app = TestApp::new().await;
    let (_, user) = app.register_user("asha", None).await;
    let product = app.seed_product("Brass Diya", dec!(500), dec!(400)).await;
    let order_item_id = settled_line(&app, user.id, product.id).await;

    let review = app
        .state
        .services
        .review
        .add_review(
            user.id,
            AddReviewInput {
                product_id: product.id,
                order_item_id,
                rating: 5,
                comment: Some("Lovely casting".to_string()),
            },
        )
        .await
        .expect("review added");
    assert_eq!(review.rating, 5);

    let item = OrderItem::find_by_id(order_item_id)
        .one(&*app.state.db)
        .await
        .expect("query")
        .expect("item");
    assert!(item.is_rated);

    // Second review for the same line item is rejected
    assert_matches!(
        app.state
            .services
            .review
            .add_review(
                user.id,
                AddReviewInput {
                    product_id: product.id,
                    order_item_id,
                    rating: 4,
                    comment: None,
                },
            )
            .await,
        Err(ServiceError::DuplicateError(_))
    );
}

#[tokio::test]
async fn rating_must_be_one_to_five() {
    let app = TestApp::new().await;
    let (_, user) = app.register_user("asha", None).await;
    let product = app.seed_product("Brass Diya", dec!(500), dec!(0)).await;
    let order_item_id = settled_line(&app, user.id, product.id).await;

    for rating in [0, 6, -1] {
        assert_matches!(
            app.state
                .services
                .review
                .add_review(
                    user.id,
                    AddReviewInput {
                        product_id: product.id,
                        order_item_id,
                        rating,
                        comment: None,
                    },
                )
                .await,
            Err(ServiceError::ValidationError(_))
        );
    }
}

#[tokio::test]
async fn only_the_buyer_may_review_a_line_item() {
    let app = TestApp::new().await;
    let (_, buyer) = app.register_user("buyer", None).await;
    let (_, stranger) = app.register_user("stranger", None).await;
    let product = app.seed_product("Brass Diya", dec!(500), dec!(0)).await;
    let order_item_id = settled_line(&app, buyer.id, product.id).await;

    assert_matches!(
        app.state
            .services
            .review
            .add_review(
                stranger.id,
                AddReviewInput {
                    product_id: product.id,
                    order_item_id,
                    rating: 5,
                    comment: None,
                },
            )
            .await,
        Err(ServiceError::Forbidden(_))
    );

    // Unknown line item is NotFound
    assert_matches!(
        app.state
            .services
            .review
            .add_review(
                buyer.id,
                AddReviewInput {
                    product_id: product.id,
                    order_item_id: Uuid::new_v4(),
                    rating: 5,
                    comment: None,
                },
            )
            .await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn product_rollup_averages_to_one_decimal() {
    let app = TestApp::new().await;
    let (_, asha) = app.register_user("asha", None).await;
    let (_, ravi) = app.register_user("ravi", None).await;
    let product = app.seed_product("Brass Diya", dec!(500), dec!(0)).await;
    let reviews = &app.state.services.review;

    let asha_item = settled_line(&app, asha.id, product.id).await;
    let ravi_item = settled_line(&app, ravi.id, product.id).await;

    reviews
        .add_review(
            asha.id,
            AddReviewInput {
                product_id: product.id,
                order_item_id: asha_item,
                rating: 5,
                comment: None,
            },
        )
        .await
        .expect("asha review");
    reviews
        .add_review(
            ravi.id,
            AddReviewInput {
                product_id: product.id,
                order_item_id: ravi_item,
                rating: 4,
                comment: None,
            },
        )
        .await
        .expect("ravi review");

    let rollup = reviews.product_reviews(product.id).await.expect("rollup");
    assert_eq!(rollup.total_reviews, 2);
    assert_eq!(rollup.average_rating, 4.5);
    assert!(rollup
        .reviews
        .iter()
        .all(|review| review.author_name.is_some()));
}

#[tokio::test]
async fn zero_reviews_roll_up_to_zero_average() {
    let app = TestApp::new().await;
    let product = app.seed_product("Brass Diya", dec!(500), dec!(0)).await;

    let rollup = app
        .state
        .services
        .review
        .product_reviews(product.id)
        .await
        .expect("rollup");
    assert_eq!(rollup.total_reviews, 0);
    assert_eq!(rollup.average_rating, 0.0);
    assert!(rollup.reviews.is_empty());
}

#[tokio::test]
async fn user_reviews_lists_only_the_callers() {
    let app = TestApp::new().await;
    let (_, asha) = app.register_user("asha", None).await;
    let (_, ravi) = app.register_user("ravi", None).await;
    let product = app.seed_product("Brass Diya", dec!(500), dec!(0)).await;
    let reviews = &app.state.services.review;

    let asha_item = settled_line(&app, asha.id, product.id).await;
    let ravi_item = settled_line(&app, ravi.id, product.id).await;

    reviews
        .add_review(
            asha.id,
            AddReviewInput {
                product_id: product.id,
                order_item_id: asha_item,
                rating: 3,
                comment: None,
            },
        )
        .await
        .expect("asha review");
    reviews
        .add_review(
            ravi.id,
            AddReviewInput {
                product_id: product.id,
                order_item_id: ravi_item,
                rating: 5,
                comment: None,
            },
        )
        .await
        .expect("ravi review");

    let mine = reviews.user_reviews(asha.id).await.expect("mine");
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].rating, 3);
}
