mod common;

use common::{seed_product, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use storefront_api::{
    entities::order::OrderStatus,
    errors::ServiceError,
    services::{
        carts::AddItemInput,
        checkout::{sign_confirmation, ShippingAddress},
    },
};
use uuid::Uuid;

/// Runs a full cart -> checkout -> confirm cycle and returns the order id.
async fn place_paid_order(app: &TestApp, customer_id: Uuid, price: Decimal, qty: i32) -> Uuid {
    let product_id = seed_product(app, "Fixture", price, qty + 10).await;
    app.state
        .services
        .carts
        .add_item(
            customer_id,
            AddItemInput {
                product_id,
                quantity: qty,
            },
        )
        .await
        .unwrap();

    let summary = app
        .state
        .services
        .checkout
        .initiate_checkout(
            customer_id,
            ShippingAddress {
                address: "1 Main St".to_string(),
                city: "Pune".to_string(),
                postal_code: "411001".to_string(),
                country: "IN".to_string(),
            },
        )
        .await
        .unwrap();

    let signature = sign_confirmation(app.merchant_secret(), &summary.intent_id, "pay_fixture");
    app.state
        .services
        .checkout
        .confirm_payment(&summary.intent_id, "pay_fixture", &signature)
        .await
        .unwrap();

    summary.order_id
}

#[tokio::test]
async fn admin_can_move_an_order_through_fulfilment() {
    let app = TestApp::new().await;
    let order_id = place_paid_order(&app, Uuid::new_v4(), dec!(20), 1).await;

    for target in ["Shipped", "Delivered"] {
        let order = app
            .state
            .services
            .orders
            .set_status(order_id, target)
            .await
            .expect("settable status");
        assert_eq!(order.status.as_str(), target);
    }
}

#[tokio::test]
async fn cancelled_is_settable_from_any_state() {
    let app = TestApp::new().await;
    let order_id = place_paid_order(&app, Uuid::new_v4(), dec!(20), 1).await;

    app.state
        .services
        .orders
        .set_status(order_id, "Delivered")
        .await
        .unwrap();
    let order = app
        .state
        .services
        .orders
        .set_status(order_id, "Cancelled")
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn pending_and_unknown_statuses_are_rejected() {
    let app = TestApp::new().await;
    let order_id = place_paid_order(&app, Uuid::new_v4(), dec!(20), 1).await;

    for bad in ["Pending", "pending", "shipped", "SHIPPED", "Returned", ""] {
        let err = app
            .state
            .services
            .orders
            .set_status(order_id, bad)
            .await
            .expect_err("status must be one of the settable set, capitalized");
        assert!(matches!(err, ServiceError::ValidationError(_)), "{bad:?}");
    }

    // The rejected writes left the order untouched.
    let order = app.state.services.orders.get_order(order_id).await.unwrap();
    assert_eq!(order.order.status, OrderStatus::Processing);
}

#[tokio::test]
async fn setting_status_on_a_missing_order_is_not_found() {
    let app = TestApp::new().await;

    let err = app
        .state
        .services
        .orders
        .set_status(Uuid::new_v4(), "Shipped")
        .await
        .expect_err("no such order");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn order_history_is_scoped_and_newest_first() {
    let app = TestApp::new().await;
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    let first = place_paid_order(&app, alice, dec!(10), 1).await;
    let second = place_paid_order(&app, alice, dec!(30), 1).await;
    place_paid_order(&app, bob, dec!(99), 1).await;

    let history = app.state.services.orders.order_history(alice).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].order.id, second, "newest first");
    assert_eq!(history[1].order.id, first);
    assert!(history.iter().all(|o| o.order.customer_id == alice));
    assert!(history.iter().all(|o| !o.items.is_empty()));
}

#[tokio::test]
async fn dashboard_aggregates_paid_orders_only() {
    let app = TestApp::new().await;
    let customer = Uuid::new_v4();

    place_paid_order(&app, customer, dec!(50), 2).await;
    place_paid_order(&app, customer, dec!(25), 1).await;

    // An initiated-but-unconfirmed checkout must not count as revenue.
    let product_id = seed_product(&app, "Unpaid", dec!(500), 5).await;
    let other = Uuid::new_v4();
    app.state
        .services
        .carts
        .add_item(
            other,
            AddItemInput {
                product_id,
                quantity: 1,
            },
        )
        .await
        .unwrap();
    app.state
        .services
        .checkout
        .initiate_checkout(
            other,
            ShippingAddress {
                address: "2 Side St".to_string(),
                city: "Pune".to_string(),
                postal_code: "411002".to_string(),
                country: "IN".to_string(),
            },
        )
        .await
        .unwrap();

    let stats = app.state.services.analytics.dashboard_stats().await.unwrap();
    assert_eq!(stats.total_orders, 2);
    assert_eq!(stats.total_revenue, dec!(125));
    // Both paid orders belong to the same customer; the unpaid one is
    // another customer and does not count.
    assert_eq!(stats.total_customers, 1);
    assert!(!stats.top_products.is_empty());
    assert_eq!(stats.top_products[0].quantity_sold, 2);
}
