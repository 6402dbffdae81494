use axum::{Json, extract::State};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(Serialize, ToSchema)]
pub struct HealthData {
    pub status: String,
    pub payments_enabled: bool,
    pub currency_enabled: bool,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "OK", body = ApiResponse<HealthData>),
    ),
        tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthData>> {
    let data = HealthData {
        status: "ok".to_string(),
        payments_enabled: state.payment_gateway.is_some(),
        currency_enabled: state.currency.is_some(),
    };

    Json(ApiResponse::success(
        "Health check",
        data,
        Some(Meta::empty()),
    ))
}

#[derive(Serialize, ToSchema)]
pub struct Banner {
    pub service: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service banner", body = ApiResponse<Banner>),
    ),
        tag = "Health"
)]
pub async fn root() -> Json<ApiResponse<Banner>> {
    Json(ApiResponse::success(
        "FERREMAS backend funcionando",
        Banner {
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        Some(Meta::empty()),
    ))
}
