use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{PaymentRecord, PaymentStatus};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CheckoutItem {
    pub product_id: i64,
    pub quantity: i32,
    /// Display name sent by the client. The catalog name is what the provider shows.
    pub name: Option<String>,
    /// Unit price the client saw. Must equal the catalog price when present.
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateCheckoutSessionRequest {
    pub items: Vec<CheckoutItem>,
    pub order_id: Option<i64>,
    pub branch_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutSessionResponse {
    pub checkout_url: String,
    pub session_id: String,
    pub amount_total: Decimal,
    pub currency: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SuccessQuery {
    pub session_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// The record moved out of `pending`.
    Settled,
    /// The record had already been settled by an earlier delivery.
    Duplicate,
    /// No local record for the session; acknowledged so the provider stops retrying.
    UnknownSession,
    /// Session completed but the funds are not confirmed yet.
    AwaitingPayment,
    /// Event type with no local effect.
    Ignored,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
    pub event_type: String,
    pub outcome: WebhookOutcome,
    pub payment_status: Option<PaymentStatus>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct PaymentRecordList {
    #[schema(value_type = Vec<PaymentRecord>)]
    pub items: Vec<PaymentRecord>,
}
