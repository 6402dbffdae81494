use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::error::AppError;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("payment provider request timed out")]
    Timeout,

    #[error("payment provider unreachable: {0}")]
    Transport(String),

    #[error("payment provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("payment provider returned an unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::UnexpectedResponse(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("Missing Stripe-Signature header")]
    MissingSignature,

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Webhook timestamp outside the tolerance window")]
    StaleTimestamp,

    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(String),
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        AppError::Webhook(err.to_string())
    }
}

/// One line of a hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLine {
    pub product_id: i64,
    pub name: String,
    /// Price in the currency's minor unit.
    pub unit_amount: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    pub lines: Vec<CheckoutLine>,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Verified provider event. `data.object` stays untyped until the event type
/// tells us what it holds.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

/// The subset of a checkout session object that reconciliation reads.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    pub payment_intent: Option<String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub payment_status: Option<String>,
}

impl WebhookEvent {
    pub fn checkout_session(&self) -> Result<CheckoutSessionObject, WebhookError> {
        serde_json::from_value(self.data.object.clone())
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))
    }
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, ProviderError>;

    /// Authenticates `payload` against `signature_header` and parses it.
    fn parse_event(&self, payload: &[u8], signature_header: &str) -> Result<WebhookEvent, WebhookError>;
}
