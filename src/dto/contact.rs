use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::ContactMessage;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ContactRequest {
    pub seller_id: i64,
    /// Between 10 and 500 characters.
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ContactMessageList {
    #[schema(value_type = Vec<ContactMessage>)]
    pub items: Vec<ContactMessage>,
}
