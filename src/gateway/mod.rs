//! Payment gateway adapter.
//!
//! The checkout orchestrator depends on the [`PaymentGateway`] trait, not
//! on a concrete client, so tests substitute an in-memory fake and the
//! production binary wires in [`HttpPaymentGateway`] once at startup.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};

use crate::{config::GatewayConfig, errors::ServiceError};

/// A provider-side record representing an authorized pending payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Opaque gateway identifier for the intent
    pub id: String,
    /// Amount in minor currency units (e.g. paise for INR)
    pub amount: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a payment intent for `amount` minor units. `receipt` is a
    /// caller-unique reference preventing gateway-side collisions.
    async fn create_intent(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<PaymentIntent, ServiceError>;
}

/// HTTP client for the payment provider's order API, authenticated with
/// merchant credentials. All calls carry a request timeout so a slow
/// gateway cannot hold a checkout open indefinitely.
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

#[derive(Serialize)]
struct CreateIntentBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Deserialize)]
struct IntentResponse {
    id: String,
    amount: i64,
    currency: String,
}

impl HttpPaymentGateway {
    pub fn new(cfg: &GatewayConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| {
                ServiceError::InternalError(format!("failed to build gateway client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            key_id: cfg.key_id.clone(),
            key_secret: cfg.key_secret.clone(),
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[instrument(skip(self))]
    async fn create_intent(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<PaymentIntent, ServiceError> {
        let url = format!("{}/orders", self.base_url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&CreateIntentBody {
                amount,
                currency,
                receipt,
            })
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("gateway request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::ExternalServiceError(format!(
                "gateway returned {status}: {body}"
            )));
        }

        let intent: IntentResponse = response.json().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("invalid gateway response: {e}"))
        })?;

        info!(intent_id = %intent.id, amount = intent.amount, "payment intent created");
        Ok(PaymentIntent {
            id: intent.id,
            amount: intent.amount,
            currency: intent.currency,
        })
    }
}
