use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::{orders::OrderList, products::ProductList},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::{LowStockQuery, OrderListQuery},
    services::{order_service, product_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_all_orders))
        .route("/inventory/low-stock", get(list_low_stock))
}

#[utoipa::path(
    get,
    path = "/admin/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "pending, paid or cancelled"),
    ),
    responses(
        (status = 200, description = "All orders, newest first", body = ApiResponse<OrderList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_all_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/admin/inventory/low-stock",
    params(
        ("threshold" = Option<i32>, Query, description = "Stock at or below this value, default 5"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "Low stock products, lowest first", body = ApiResponse<ProductList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_low_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LowStockQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_low_stock(&state, &user, query).await?;
    Ok(Json(resp))
}
