use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Branch, Seller},
    response::ApiResponse,
    services::directory_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_branches))
        .route("/{id}", get(get_branch))
        .route("/{id}/sellers", get(list_branch_sellers))
}

#[utoipa::path(
    get,
    path = "/branches",
    responses(
        (status = 200, description = "All branches", body = ApiResponse<Vec<Branch>>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Directory"
)]
pub async fn list_branches(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<Branch>>>> {
    let resp = directory_service::list_branches(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/branches/{id}",
    params(("id" = i64, Path, description = "Branch ID")),
    responses(
        (status = 200, description = "Branch", body = ApiResponse<Branch>),
        (status = 404, description = "Branch not found")
    ),
    tag = "Directory"
)]
pub async fn get_branch(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Branch>>> {
    let resp = directory_service::get_branch(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/branches/{id}/sellers",
    params(("id" = i64, Path, description = "Branch ID")),
    responses(
        (status = 200, description = "Sellers of the branch", body = ApiResponse<Vec<Seller>>)
    ),
    tag = "Directory"
)]
pub async fn list_branch_sellers(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<Seller>>>> {
    let resp = directory_service::list_branch_sellers(&state, id).await?;
    Ok(Json(resp))
}
