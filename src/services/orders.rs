use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{order, order::OrderStatus, order_item, Order, OrderItem},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Order read-side and admin status transitions. Orders are created only
/// by the checkout orchestrator; this service never inserts them.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// A customer's order history, newest first, with line items.
    pub async fn order_history(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<OrderWithItems>, ServiceError> {
        let orders = Order::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        self.with_items(orders).await
    }

    /// A single order with items. Ownership is checked by the caller.
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderWithItems, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))?;

        let items = order
            .find_related(OrderItem)
            .all(&*self.db)
            .await?;

        Ok(OrderWithItems { order, items })
    }

    /// All orders, newest first. Admin surface.
    pub async fn list_all(&self) -> Result<Vec<order::Model>, ServiceError> {
        Ok(Order::find()
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Admin status transition. Accepts only the settable targets
    /// (Processing, Shipped, Delivered, Cancelled); `Pending` is the
    /// implicit initial state and is rejected.
    ///
    /// No forward-only ordering is enforced between the settable states;
    /// the transition is evented with old and new values so the history
    /// stays observable.
    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        order_id: Uuid,
        new_status: &str,
    ) -> Result<order::Model, ServiceError> {
        let status = OrderStatus::parse_settable(new_status).ok_or_else(|| {
            ServiceError::ValidationError(format!("Invalid status provided: {new_status}"))
        })?;

        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))?;

        let old_status = order.status;
        let mut active: order::ActiveModel = order.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        let order = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: old_status.as_str().to_string(),
                new_status: status.as_str().to_string(),
            })
            .await;

        info!(order_id = %order_id, from = old_status.as_str(), to = status.as_str(), "order status changed");
        Ok(order)
    }

    async fn with_items(
        &self,
        orders: Vec<order::Model>,
    ) -> Result<Vec<OrderWithItems>, ServiceError> {
        let mut result = Vec::with_capacity(orders.len());
        for order in orders {
            let items = order.find_related(OrderItem).all(&*self.db).await?;
            result.push(OrderWithItems { order, items });
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_is_not_a_settable_target() {
        assert!(OrderStatus::parse_settable("Pending").is_none());
        assert!(OrderStatus::parse_settable("pending").is_none());
    }

    #[test]
    fn only_known_statuses_parse() {
        assert_eq!(
            OrderStatus::parse_settable("Processing"),
            Some(OrderStatus::Processing)
        );
        assert_eq!(
            OrderStatus::parse_settable("Shipped"),
            Some(OrderStatus::Shipped)
        );
        assert_eq!(
            OrderStatus::parse_settable("Delivered"),
            Some(OrderStatus::Delivered)
        );
        assert_eq!(
            OrderStatus::parse_settable("Cancelled"),
            Some(OrderStatus::Cancelled)
        );
        assert!(OrderStatus::parse_settable("Refunded").is_none());
        assert!(OrderStatus::parse_settable("").is_none());
    }
}
