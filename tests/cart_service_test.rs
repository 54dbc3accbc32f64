mod common;

use common::{seed_product, TestApp};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use storefront_api::{
    entities::{cart, Cart},
    errors::ServiceError,
    services::carts::AddItemInput,
};
use uuid::Uuid;

#[tokio::test]
async fn first_add_creates_the_cart_lazily() {
    let app = TestApp::new().await;
    let customer_id = Uuid::new_v4();
    let product_id = seed_product(&app, "Desk", dec!(150), 5).await;

    // No cart yet.
    let err = app
        .state
        .services
        .carts
        .get_cart(customer_id)
        .await
        .expect_err("new customer has no cart");
    assert!(matches!(err, ServiceError::NotFound(_)));

    let cart = app
        .state
        .services
        .carts
        .add_item(
            customer_id,
            AddItemInput {
                product_id,
                quantity: 1,
            },
        )
        .await
        .expect("add creates the cart");

    assert_eq!(cart.cart.customer_id, customer_id);
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].name, "Desk");
    assert_eq!(cart.items[0].unit_price, dec!(150));
    assert_eq!(cart.subtotal, dec!(150));

    // Only one cart row per customer.
    let carts = Cart::find()
        .filter(cart::Column::CustomerId.eq(customer_id))
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(carts.len(), 1);
}

#[tokio::test]
async fn adding_the_same_product_merges_quantities() {
    let app = TestApp::new().await;
    let customer_id = Uuid::new_v4();
    let product_id = seed_product(&app, "Pen", dec!(2.50), 10).await;

    for _ in 0..2 {
        app.state
            .services
            .carts
            .add_item(
                customer_id,
                AddItemInput {
                    product_id,
                    quantity: 2,
                },
            )
            .await
            .unwrap();
    }

    let cart = app.state.services.carts.get_cart(customer_id).await.unwrap();
    assert_eq!(cart.items.len(), 1, "same product merges into one line");
    assert_eq!(cart.items[0].quantity, 4);
    assert_eq!(cart.subtotal, dec!(10));
}

#[tokio::test]
async fn stock_limit_counts_quantity_already_in_the_cart() {
    let app = TestApp::new().await;
    let customer_id = Uuid::new_v4();
    let product_id = seed_product(&app, "Lamp", dec!(30), 3).await;

    app.state
        .services
        .carts
        .add_item(
            customer_id,
            AddItemInput {
                product_id,
                quantity: 2,
            },
        )
        .await
        .unwrap();

    // 2 in the cart + 2 requested > 3 in stock.
    let err = app
        .state
        .services
        .carts
        .add_item(
            customer_id,
            AddItemInput {
                product_id,
                quantity: 2,
            },
        )
        .await
        .expect_err("over-stock add must fail");
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    // The failed add did not change the line.
    let cart = app.state.services.carts.get_cart(customer_id).await.unwrap();
    assert_eq!(cart.items[0].quantity, 2);
}

#[tokio::test]
async fn unknown_product_and_bad_quantity_are_rejected() {
    let app = TestApp::new().await;
    let customer_id = Uuid::new_v4();

    let err = app
        .state
        .services
        .carts
        .add_item(
            customer_id,
            AddItemInput {
                product_id: Uuid::new_v4(),
                quantity: 1,
            },
        )
        .await
        .expect_err("unknown product");
    assert!(matches!(err, ServiceError::NotFound(_)));

    let product_id = seed_product(&app, "Chair", dec!(75), 5).await;
    let err = app
        .state
        .services
        .carts
        .add_item(
            customer_id,
            AddItemInput {
                product_id,
                quantity: 0,
            },
        )
        .await
        .expect_err("zero quantity");
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn remove_deletes_the_line_regardless_of_quantity() {
    let app = TestApp::new().await;
    let customer_id = Uuid::new_v4();
    let pen = seed_product(&app, "Pen", dec!(2), 10).await;
    let ink = seed_product(&app, "Ink", dec!(9), 10).await;

    for (product_id, quantity) in [(pen, 3), (ink, 1)] {
        app.state
            .services
            .carts
            .add_item(
                customer_id,
                AddItemInput {
                    product_id,
                    quantity,
                },
            )
            .await
            .unwrap();
    }

    let cart = app
        .state
        .services
        .carts
        .remove_item(customer_id, pen)
        .await
        .expect("remove succeeds");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].product_id, ink);
    assert_eq!(cart.subtotal, dec!(9));

    // Removing again is a not-found, not a no-op.
    let err = app
        .state
        .services
        .carts
        .remove_item(customer_id, pen)
        .await
        .expect_err("line already gone");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn cart_lines_keep_their_price_snapshot() {
    let app = TestApp::new().await;
    let customer_id = Uuid::new_v4();
    let product_id = seed_product(&app, "Monitor", dec!(200), 5).await;

    app.state
        .services
        .carts
        .add_item(
            customer_id,
            AddItemInput {
                product_id,
                quantity: 1,
            },
        )
        .await
        .unwrap();

    // Reprice the catalog entry after the line was added.
    app.state
        .services
        .catalog
        .update_product(
            product_id,
            storefront_api::services::catalog::UpdateProductInput {
                price: Some(dec!(250)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let cart = app.state.services.carts.get_cart(customer_id).await.unwrap();
    assert_eq!(cart.items[0].unit_price, dec!(200), "snapshot is immutable");
    assert_eq!(cart.subtotal, dec!(200));
}
