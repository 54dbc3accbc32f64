use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    entities::{order, order_item, Order, OrderItem, Product},
    errors::ServiceError,
};

const TOP_PRODUCT_LIMIT: usize = 5;

/// Admin dashboard statistics over paid orders.
#[derive(Clone)]
pub struct AnalyticsService {
    db: Arc<DatabaseConnection>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub name: String,
    pub quantity_sold: i64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DashboardStats {
    pub total_revenue: Decimal,
    pub total_orders: u64,
    /// Distinct customers with at least one paid order
    pub total_customers: u64,
    pub top_products: Vec<TopProduct>,
    pub total_products: u64,
}

impl AnalyticsService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Revenue, order count, and distinct paying customers over paid
    /// orders, the top five products by quantity sold, and the catalog
    /// size.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ServiceError> {
        let paid_orders = Order::find()
            .filter(order::Column::IsPaid.eq(true))
            .all(&*self.db)
            .await?;

        let total_revenue: Decimal = paid_orders.iter().map(|o| o.total_price).sum();
        let total_orders = paid_orders.len() as u64;
        let total_customers = paid_orders
            .iter()
            .map(|o| o.customer_id)
            .collect::<HashSet<_>>()
            .len() as u64;

        let paid_ids: Vec<Uuid> = paid_orders.iter().map(|o| o.id).collect();
        let mut sold: HashMap<Uuid, (String, i64)> = HashMap::new();
        if !paid_ids.is_empty() {
            let items = OrderItem::find()
                .filter(order_item::Column::OrderId.is_in(paid_ids))
                .all(&*self.db)
                .await?;
            for item in items {
                let entry = sold
                    .entry(item.product_id)
                    .or_insert_with(|| (item.name.clone(), 0));
                entry.1 += i64::from(item.quantity);
            }
        }

        let mut top_products: Vec<TopProduct> = sold
            .into_iter()
            .map(|(product_id, (name, quantity_sold))| TopProduct {
                product_id,
                name,
                quantity_sold,
            })
            .collect();
        top_products.sort_by(|a, b| b.quantity_sold.cmp(&a.quantity_sold));
        top_products.truncate(TOP_PRODUCT_LIMIT);

        let total_products = Product::find().count(&*self.db).await?;

        Ok(DashboardStats {
            total_revenue,
            total_orders,
            total_customers,
            top_products,
            total_products,
        })
    }
}
