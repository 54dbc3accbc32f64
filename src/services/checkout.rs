//! Checkout orchestration and payment reconciliation.
//!
//! `initiate_checkout` is the only multi-step write flow in the system:
//! cart read, gateway call, then an Order+Payment pair persisted inside a
//! single transaction. The gateway is called before any local write, so a
//! gateway failure never leaves a dangling order. `confirm_payment` is the
//! second, independent flow driven by the gateway's callback and trusts
//! nothing until the HMAC signature checks out.

use std::sync::Arc;

use chrono::Utc;
use hmac::{Hmac, Mac};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::AppConfig,
    entities::{
        cart, cart_item, order, order_item,
        order::OrderStatus,
        payment,
        payment::PaymentStatus,
        Cart, CartItem, Order, Payment,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    gateway::PaymentGateway,
};

type HmacSha256 = Hmac<Sha256>;

/// Shipping destination captured at checkout time. All four fields are
/// required.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct ShippingAddress {
    #[validate(length(min = 1))]
    pub address: String,
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(length(min = 1))]
    pub postal_code: String,
    #[validate(length(min = 1))]
    pub country: String,
}

/// What the client needs to drive the gateway's payment UI.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CheckoutSummary {
    pub order_id: Uuid,
    pub intent_id: String,
    pub currency: String,
    /// Amount in minor currency units
    pub amount: i64,
}

/// Outcome of a signature-verified payment confirmation.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PaymentConfirmation {
    pub order_id: Uuid,
    /// True when this confirmation had already been applied; the call is
    /// idempotent and re-confirms without re-applying side effects.
    pub already_confirmed: bool,
}

#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    gateway: Arc<dyn PaymentGateway>,
    event_sender: EventSender,
    merchant_secret: String,
    currency: String,
    initial_status: OrderStatus,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        gateway: Arc<dyn PaymentGateway>,
        event_sender: EventSender,
        config: &AppConfig,
    ) -> Self {
        // Config validation restricts the value to these two.
        let initial_status = if config.initial_order_status == "pending" {
            OrderStatus::Pending
        } else {
            OrderStatus::Processing
        };

        Self {
            db,
            gateway,
            event_sender,
            merchant_secret: config.gateway.key_secret.clone(),
            currency: config.currency.clone(),
            initial_status,
        }
    }

    /// Creates a gateway payment intent from the customer's cart and
    /// persists the Order+Payment pair.
    ///
    /// The total is computed from the cart's snapshotted line prices, not
    /// live catalog prices. The cart itself is untouched; it is cleared
    /// only when the payment is confirmed.
    #[instrument(skip(self, shipping), fields(customer_id = %customer_id))]
    pub async fn initiate_checkout(
        &self,
        customer_id: Uuid,
        shipping: ShippingAddress,
    ) -> Result<CheckoutSummary, ServiceError> {
        let cart = Cart::find()
            .filter(cart::Column::CustomerId.eq(customer_id))
            .one(&*self.db)
            .await?;

        let items = match &cart {
            Some(cart) => cart.find_related(CartItem).all(&*self.db).await?,
            None => Vec::new(),
        };
        if items.is_empty() {
            return Err(ServiceError::ValidationError("Cart is empty".to_string()));
        }

        let total: Decimal = items
            .iter()
            .map(|i| i.unit_price * Decimal::from(i.quantity))
            .sum();
        let amount = to_minor_units(total)?;

        // Gateway call happens before any local write; on failure nothing
        // is persisted and the checkout aborts cleanly.
        let receipt = new_receipt_ref();
        let intent = self
            .gateway
            .create_intent(amount, &self.currency, &receipt)
            .await?;

        let order_id = Uuid::new_v4();
        let payment_id = Uuid::new_v4();

        let txn = self.db.begin().await?;

        let order = order::ActiveModel {
            id: Set(order_id),
            customer_id: Set(customer_id),
            shipping_address: Set(shipping.address),
            shipping_city: Set(shipping.city),
            shipping_postal_code: Set(shipping.postal_code),
            shipping_country: Set(shipping.country),
            total_price: Set(total),
            currency: Set(self.currency.clone()),
            is_paid: Set(false),
            paid_at: Set(None),
            status: Set(self.initial_status),
            payment_id: Set(Some(payment_id)),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        order.insert(&txn).await?;

        for line in &items {
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(line.product_id),
                name: Set(line.name.clone()),
                unit_price: Set(line.unit_price),
                quantity: Set(line.quantity),
                created_at: Set(Utc::now()),
            };
            item.insert(&txn).await?;
        }

        let payment = payment::ActiveModel {
            id: Set(payment_id),
            order_id: Set(order_id),
            customer_id: Set(customer_id),
            gateway_order_id: Set(intent.id.clone()),
            gateway_payment_id: Set(None),
            signature: Set(None),
            amount: Set(total),
            status: Set(PaymentStatus::Pending),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        payment.insert(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCreated(order_id))
            .await;
        self.event_sender
            .send_or_log(Event::CheckoutInitiated {
                order_id,
                gateway_order_id: intent.id.clone(),
            })
            .await;

        info!(order_id = %order_id, intent_id = %intent.id, amount, "checkout initiated");
        Ok(CheckoutSummary {
            order_id,
            intent_id: intent.id,
            currency: intent.currency,
            amount: intent.amount,
        })
    }

    /// Reconciles a gateway payment confirmation.
    ///
    /// Reachable without session authentication; authenticity is
    /// established by recomputing the HMAC over
    /// `"{gateway_order_id}|{gateway_payment_id}"` and comparing in
    /// constant time. On a valid first confirmation the payment is
    /// completed, the order marked paid and moved to Processing, and the
    /// customer's cart deleted, all in one transaction. A repeat
    /// confirmation with a valid signature short-circuits successfully
    /// without re-applying side effects.
    #[instrument(skip(self, signature), fields(gateway_order_id = %gateway_order_id))]
    pub async fn confirm_payment(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<PaymentConfirmation, ServiceError> {
        if !verify_signature(
            &self.merchant_secret,
            gateway_order_id,
            gateway_payment_id,
            signature,
        ) {
            // Security event: either a forgery attempt or a
            // misconfigured merchant secret.
            warn!(
                gateway_order_id,
                "payment confirmation rejected: signature mismatch"
            );
            return Err(ServiceError::InvalidSignature);
        }

        let payment = Payment::find()
            .filter(payment::Column::GatewayOrderId.eq(gateway_order_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Payment record not found".to_string()))?;

        // Only a pending payment may move forward; completed re-confirms
        // idempotently and failed stays failed.
        match payment.status {
            PaymentStatus::Completed => {
                info!(order_id = %payment.order_id, "payment already confirmed, re-confirming idempotently");
                return Ok(PaymentConfirmation {
                    order_id: payment.order_id,
                    already_confirmed: true,
                });
            }
            PaymentStatus::Failed => {
                return Err(ServiceError::Conflict(
                    "Payment has already failed and cannot be completed".to_string(),
                ));
            }
            PaymentStatus::Pending => {}
        }

        let order_id = payment.order_id;
        let payment_record_id = payment.id;
        let customer_id = payment.customer_id;

        let txn = self.db.begin().await?;

        let order = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {order_id} not found")))?;

        let mut payment_update: payment::ActiveModel = payment.into();
        payment_update.gateway_payment_id = Set(Some(gateway_payment_id.to_string()));
        payment_update.signature = Set(Some(signature.to_string()));
        payment_update.status = Set(PaymentStatus::Completed);
        payment_update.updated_at = Set(Utc::now());
        payment_update.update(&txn).await?;

        let mut order_update: order::ActiveModel = order.into();
        order_update.is_paid = Set(true);
        order_update.paid_at = Set(Some(Utc::now()));
        order_update.status = Set(OrderStatus::Processing);
        order_update.updated_at = Set(Utc::now());
        order_update.update(&txn).await?;

        // Cart deletion is idempotent: an absent cart is not an error.
        if let Some(cart) = Cart::find()
            .filter(cart::Column::CustomerId.eq(customer_id))
            .one(&txn)
            .await?
        {
            CartItem::delete_many()
                .filter(cart_item::Column::CartId.eq(cart.id))
                .exec(&txn)
                .await?;
            let cart_id = cart.id;
            cart.delete(&txn).await?;
            self.event_sender.send_or_log(Event::CartCleared(cart_id)).await;
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::PaymentCompleted {
                order_id,
                payment_id: payment_record_id,
            })
            .await;

        info!(order_id = %order_id, "payment confirmed and order marked paid");
        Ok(PaymentConfirmation {
            order_id,
            already_confirmed: false,
        })
    }
}

/// Computes the gateway confirmation signature: hex-encoded HMAC-SHA256
/// over `"{gateway_order_id}|{gateway_payment_id}"` keyed by the merchant
/// secret.
pub fn sign_confirmation(secret: &str, gateway_order_id: &str, gateway_payment_id: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(format!("{gateway_order_id}|{gateway_payment_id}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time comparison of the supplied signature against the
/// recomputed digest.
pub fn verify_signature(
    secret: &str,
    gateway_order_id: &str,
    gateway_payment_id: &str,
    supplied: &str,
) -> bool {
    let expected = sign_confirmation(secret, gateway_order_id, gateway_payment_id);
    constant_time_eq(&expected, supplied)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

/// Converts a decimal amount to integer minor currency units (x100).
/// Rejects amounts with sub-minor-unit precision instead of rounding, so
/// monetary math never drifts.
pub fn to_minor_units(amount: Decimal) -> Result<i64, ServiceError> {
    let scaled = amount * Decimal::from(100);
    if scaled != scaled.trunc() {
        return Err(ServiceError::ValidationError(
            "amount has sub-minor-unit precision".to_string(),
        ));
    }
    scaled.trunc().to_i64().ok_or_else(|| {
        ServiceError::ValidationError("amount out of representable range".to_string())
    })
}

/// Unique receipt reference for gateway-side collision avoidance.
fn new_receipt_ref() -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
    format!("rcpt_{}_{}", Utc::now().timestamp_millis(), suffix)
}
