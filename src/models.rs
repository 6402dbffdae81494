use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    /// Catalog manager.
    Mantenedor,
    Admin,
    ServiceAccount,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Mantenedor => "mantenedor",
            Role::Admin => "admin",
            Role::ServiceAccount => "service_account",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored account. The hash is an argon2 PHC string and never leaves the process.
#[derive(Debug, Clone)]
pub struct User {
    pub username: String,
    pub role: Role,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub model: Option<String>,
    pub brand: Option<String>,
    pub code: String,
    pub stock: i32,
    pub is_promo: bool,
    pub is_new: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub model: Option<String>,
    pub brand: Option<String>,
    pub code: String,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub is_promo: bool,
    #[serde(default)]
    pub is_new: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub product_id: i64,
    pub quantity: i32,
    /// Catalog price when the order was placed.
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: i64,
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentItemSnapshot {
    pub product_id: i64,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentRecord {
    pub id: i64,
    pub client_username: String,
    pub stripe_session_id: String,
    pub stripe_payment_intent_id: Option<String>,
    pub amount_total: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items_snapshot: Vec<PaymentItemSnapshot>,
    pub order_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Branch {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub city: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Seller {
    pub id: i64,
    pub name: String,
    pub branch_id: i64,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContactMessage {
    pub id: i64,
    pub client_username: String,
    pub seller_id: i64,
    pub message: String,
    pub sent_at: DateTime<Utc>,
    pub status: String,
}
