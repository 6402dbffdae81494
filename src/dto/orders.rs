use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Order;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderLineRequest {
    pub product_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderLineRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
