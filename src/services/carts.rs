use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{cart, cart_item, product, Cart, CartItem, Product},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Shopping cart service.
///
/// A cart is keyed by its owning customer and created lazily on the first
/// add. Line items snapshot the product's name, price, and first image at
/// add time; adding a product already in the cart merges quantities. Every
/// add re-checks stock against the live catalog.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

/// Cart plus its line items, with the subtotal computed from the
/// snapshotted line prices.
#[derive(Debug, Serialize)]
pub struct CartWithItems {
    pub cart: cart::Model,
    pub items: Vec<cart_item::Model>,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Copy)]
pub struct AddItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Returns the customer's cart with items, or `NotFound` if none exists.
    pub async fn get_cart(&self, customer_id: Uuid) -> Result<CartWithItems, ServiceError> {
        let cart = Cart::find()
            .filter(cart::Column::CustomerId.eq(customer_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound("Cart not found for this customer".to_string())
            })?;

        let items = cart
            .find_related(CartItem)
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(with_subtotal(cart, items))
    }

    /// Adds a product to the cart, creating the cart if necessary.
    ///
    /// Fails with `NotFound` when the product does not exist and with
    /// `InsufficientStock` when the requested quantity (plus any quantity
    /// already in the cart) exceeds the available stock.
    #[instrument(skip(self), fields(customer_id = %customer_id, product_id = %input.product_id))]
    pub async fn add_item(
        &self,
        customer_id: Uuid,
        input: AddItemInput,
    ) -> Result<CartWithItems, ServiceError> {
        if input.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "quantity must be at least 1".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let product = Product::find_by_id(input.product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", input.product_id))
            })?;

        let cart = match Cart::find()
            .filter(cart::Column::CustomerId.eq(customer_id))
            .one(&txn)
            .await?
        {
            Some(cart) => cart,
            None => {
                let cart = cart::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    customer_id: Set(customer_id),
                    created_at: Set(Utc::now()),
                    updated_at: Set(Utc::now()),
                };
                cart.insert(&txn).await?
            }
        };

        let existing = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(input.product_id))
            .one(&txn)
            .await?;

        let requested = existing.as_ref().map_or(0, |i| i.quantity) + input.quantity;
        if product.stock < requested {
            return Err(ServiceError::InsufficientStock(format!(
                "only {} units are available for this product",
                product.stock
            )));
        }

        match existing {
            Some(item) => {
                let mut item: cart_item::ActiveModel = item.into();
                item.quantity = Set(requested);
                item.updated_at = Set(Utc::now());
                item.update(&txn).await?;
            }
            None => {
                let item = cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    cart_id: Set(cart.id),
                    product_id: Set(product.id),
                    name: Set(product.name.clone()),
                    unit_price: Set(product.price),
                    image: Set(first_image(&product)),
                    quantity: Set(input.quantity),
                    created_at: Set(Utc::now()),
                    updated_at: Set(Utc::now()),
                };
                item.insert(&txn).await?;
            }
        }

        let mut cart_update: cart::ActiveModel = cart.clone().into();
        cart_update.updated_at = Set(Utc::now());
        let cart = cart_update.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id: cart.id,
                product_id: input.product_id,
            })
            .await;

        info!(cart_id = %cart.id, quantity = input.quantity, "item added to cart");
        self.get_cart(customer_id).await
    }

    /// Removes a product line from the customer's cart entirely.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
    ) -> Result<CartWithItems, ServiceError> {
        let cart = Cart::find()
            .filter(cart::Column::CustomerId.eq(customer_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart not found".to_string()))?;

        let item = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Item not found in cart".to_string()))?;

        item.delete(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                cart_id: cart.id,
                product_id,
            })
            .await;

        self.get_cart(customer_id).await
    }
}

fn with_subtotal(cart: cart::Model, items: Vec<cart_item::Model>) -> CartWithItems {
    let subtotal = items
        .iter()
        .map(|i| i.unit_price * Decimal::from(i.quantity))
        .sum();
    CartWithItems {
        cart,
        items,
        subtotal,
    }
}

fn first_image(product: &product::Model) -> Option<String> {
    product
        .images
        .as_array()
        .and_then(|a| a.first())
        .and_then(|v| v.as_str())
        .map(str::to_string)
}
