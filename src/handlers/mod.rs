use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    config::AppConfig,
    events::EventSender,
    gateway::PaymentGateway,
    services::{AnalyticsService, CartService, CatalogService, CheckoutService, OrderService},
};

pub mod admin;
pub mod carts;
pub mod checkout;
pub mod common;
pub mod orders;
pub mod products;

/// Aggregated domain services shared by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub carts: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
    pub analytics: Arc<AnalyticsService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        gateway: Arc<dyn PaymentGateway>,
        config: &AppConfig,
    ) -> Self {
        Self {
            catalog: Arc::new(CatalogService::new(db.clone(), event_sender.clone())),
            carts: Arc::new(CartService::new(db.clone(), event_sender.clone())),
            checkout: Arc::new(CheckoutService::new(
                db.clone(),
                gateway,
                event_sender.clone(),
                config,
            )),
            orders: Arc::new(OrderService::new(db.clone(), event_sender)),
            analytics: Arc::new(AnalyticsService::new(db)),
        }
    }
}
