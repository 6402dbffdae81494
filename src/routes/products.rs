use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};

use crate::{
    dto::products::{ProductList, StockAdjustRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{NewProduct, Product},
    response::ApiResponse,
    routes::params::ProductQuery,
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/{id}", get(get_product))
        .route("/{id}/stock", patch(adjust_stock))
}

#[utoipa::path(
    get,
    path = "/products",
    params(
        ("promo" = Option<bool>, Query, description = "Filter by promotion flag"),
        ("new" = Option<bool>, Query, description = "Filter by novelty flag"),
    ),
    responses(
        (status = 200, description = "List products", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_products(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Get product", body = ApiResponse<Product>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::get_product(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/products",
    request_body = NewProduct,
    responses(
        (status = 201, description = "Create product", body = ApiResponse<Product>),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Duplicate product code")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NewProduct>,
) -> AppResult<(StatusCode, Json<ApiResponse<Product>>)> {
    let resp = product_service::create_product(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    patch,
    path = "/products/{id}/stock",
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    request_body = StockAdjustRequest,
    responses(
        (status = 200, description = "Adjusted product", body = ApiResponse<Product>),
        (status = 400, description = "Zero delta or negative resulting stock"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<StockAdjustRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::adjust_stock(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
