use rust_decimal::Decimal;

use crate::{
    audit::log_audit,
    dto::products::{ProductList, StockAdjustRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, guards},
    models::{NewProduct, Product},
    response::{ApiResponse, Meta, paginate},
    routes::params::{LowStockQuery, ProductQuery},
    state::AppState,
    store::{ProductFilter, StoreError},
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let filter = ProductFilter {
        promo: query.promo,
        new: query.new,
        max_stock: None,
    };
    let items = state.products.list(&filter)?;
    let meta = Meta::total(items.len());
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(state: &AppState, id: i64) -> AppResult<ApiResponse<Product>> {
    let product = state.products.find_by_id(id)?;
    Ok(ApiResponse::success("Product", product, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: NewProduct,
) -> AppResult<ApiResponse<Product>> {
    guards::MANTENEDOR.authorize(user)?;

    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("Product name must not be empty".into()));
    }
    if payload.code.trim().is_empty() {
        return Err(AppError::BadRequest("Product code must not be empty".into()));
    }
    if payload.price < Decimal::ZERO {
        return Err(AppError::BadRequest("Price must not be negative".into()));
    }
    if payload.stock < 0 {
        return Err(AppError::BadRequest("Stock must not be negative".into()));
    }

    let product = state.products.create(payload)?;

    log_audit(
        Some(&user.username),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id, "code": product.code })),
    );

    Ok(ApiResponse::success(
        "Product created",
        product,
        Some(Meta::empty()),
    ))
}

pub async fn adjust_stock(
    state: &AppState,
    user: &AuthUser,
    id: i64,
    payload: StockAdjustRequest,
) -> AppResult<ApiResponse<Product>> {
    guards::CATALOG_STAFF.authorize(user)?;
    if payload.delta == 0 {
        return Err(AppError::BadRequest("delta must not be 0".into()));
    }

    let product = state
        .products
        .adjust_stock(id, payload.delta)
        .map_err(|err| match err {
            StoreError::InsufficientStock { available, .. } => AppError::BadRequest(format!(
                "Stock cannot be negative. Available stock: {available}"
            )),
            other => other.into(),
        })?;

    log_audit(
        Some(&user.username),
        "inventory_adjust",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id, "delta": payload.delta })),
    );

    Ok(ApiResponse::success(
        "Inventory updated",
        product,
        Some(Meta::empty()),
    ))
}

pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<ProductList>> {
    guards::CATALOG_STAFF.authorize(user)?;
    let threshold = query.threshold.unwrap_or(5);

    let mut items = state.products.list(&ProductFilter {
        max_stock: Some(threshold),
        ..ProductFilter::default()
    })?;
    items.sort_by_key(|p| p.stock);

    let (items, meta) = paginate(items, &query.pagination());
    Ok(ApiResponse::success("Low stock", ProductList { items }, Some(meta)))
}
