use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::currency::{ConversionResult, ConvertQuery},
    error::AppResult,
    response::{ApiResponse, Meta},
    services::currency_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/convert", get(convert))
}

#[utoipa::path(
    get,
    path = "/currency/convert",
    params(
        ("amount" = String, Query, description = "Amount to convert, greater than 0"),
        ("from_currency" = String, Query, description = "ISO 4217 source code"),
        ("to_currency" = String, Query, description = "ISO 4217 target code"),
    ),
    responses(
        (status = 200, description = "Converted amount", body = ApiResponse<ConversionResult>),
        (status = 400, description = "Invalid amount or unsupported currency"),
        (status = 500, description = "Rate provider failure"),
        (status = 503, description = "Conversion not configured")
    ),
    tag = "Currency"
)]
pub async fn convert(
    State(state): State<AppState>,
    Query(query): Query<ConvertQuery>,
) -> AppResult<Json<ApiResponse<ConversionResult>>> {
    let result = currency_service::convert_currency(&state, query).await?;
    Ok(Json(ApiResponse::success(
        "Conversion",
        result,
        Some(Meta::empty()),
    )))
}
