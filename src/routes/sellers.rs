use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    error::AppResult, models::Seller, response::ApiResponse, services::directory_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", get(get_seller))
}

#[utoipa::path(
    get,
    path = "/sellers/{id}",
    params(("id" = i64, Path, description = "Seller ID")),
    responses(
        (status = 200, description = "Seller", body = ApiResponse<Seller>),
        (status = 404, description = "Seller not found")
    ),
    tag = "Directory"
)]
pub async fn get_seller(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Seller>>> {
    let resp = directory_service::get_seller(&state, id).await?;
    Ok(Json(resp))
}
