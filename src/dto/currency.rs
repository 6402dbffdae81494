use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConvertQuery {
    pub amount: Decimal,
    pub from_currency: String,
    pub to_currency: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConversionResult {
    pub amount: Decimal,
    pub from_currency: String,
    pub to_currency: String,
    pub converted_amount: Decimal,
}
