use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use crate::{
    audit::log_audit,
    dto::orders::{CreateOrderRequest, OrderList},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, guards},
    models::{Order, OrderItem},
    response::{ApiResponse, Meta, paginate},
    routes::params::OrderListQuery,
    state::AppState,
    store::{NewOrder, OrderFilter, StockLine, StoreError},
};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("The order must contain at least one product")]
    EmptyOrder,

    #[error("Quantity for product {0} must be greater than 0")]
    InvalidQuantity(i64),

    #[error("Product with ID {0} not found")]
    ProductNotFound(i64),

    #[error("Insufficient stock for product '{name}'. Available stock: {available}")]
    InsufficientStock {
        product_id: i64,
        name: String,
        available: i32,
    },

    #[error("Order total is too large")]
    AmountOverflow,

    #[error("Failed to update product stock")]
    StockUpdateFailed,
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::EmptyOrder
            | OrderError::InvalidQuantity(_)
            | OrderError::AmountOverflow => {
                AppError::BadRequest(err.to_string())
            }
            OrderError::ProductNotFound(_) => AppError::NotFound(err.to_string()),
            OrderError::InsufficientStock {
                product_id,
                name,
                available,
            } => AppError::InsufficientStock {
                product_id,
                name,
                available,
            },
            OrderError::StockUpdateFailed => AppError::StockUpdateFailed,
        }
    }
}

/// Rounds a money amount to cents, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Validates every line against the catalog, then reserves all stock in one
/// all-or-nothing step and records the order as `pending`.
pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    guards::CLIENT.authorize(user)?;
    let order = place_order_for(state, &user.username, payload)?;

    log_audit(
        Some(&user.username),
        "order_placed",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": order.id,
            "total_amount": order.total_amount,
            "lines": order.items.len(),
        })),
    );

    Ok(ApiResponse::success("Order created", order, Some(Meta::empty())))
}

fn place_order_for(
    state: &AppState,
    username: &str,
    payload: CreateOrderRequest,
) -> Result<Order, OrderError> {
    if payload.items.is_empty() {
        return Err(OrderError::EmptyOrder);
    }

    let mut total = Decimal::ZERO;
    let mut items = Vec::with_capacity(payload.items.len());
    let mut requested: HashMap<i64, i32> = HashMap::new();

    for line in &payload.items {
        if line.quantity <= 0 {
            return Err(OrderError::InvalidQuantity(line.product_id));
        }

        let product = state
            .products
            .find_by_id(line.product_id)
            .map_err(|err| match err {
                StoreError::NotFound { .. } => OrderError::ProductNotFound(line.product_id),
                other => {
                    tracing::error!(error = %other, "catalog lookup failed");
                    OrderError::StockUpdateFailed
                }
            })?;

        let already = requested.entry(product.id).or_insert(0);
        let available = product.stock - *already;
        if available < line.quantity {
            return Err(OrderError::InsufficientStock {
                product_id: product.id,
                name: product.name,
                available,
            });
        }
        *already += line.quantity;

        total = product
            .price
            .checked_mul(Decimal::from(line.quantity))
            .and_then(|line_total| total.checked_add(line_total))
            .ok_or(OrderError::AmountOverflow)?;
        items.push(OrderItem {
            product_id: product.id,
            quantity: line.quantity,
            unit_price: product.price,
        });
    }

    let lines: Vec<StockLine> = items.iter().map(StockLine::from).collect();
    state.products.reserve(&lines).map_err(|err| match err {
        // Another order took the stock between validation and commit.
        StoreError::InsufficientStock {
            product_id,
            name,
            available,
        } => OrderError::InsufficientStock {
            product_id,
            name,
            available,
        },
        other => {
            tracing::error!(error = %other, "stock commit failed");
            OrderError::StockUpdateFailed
        }
    })?;

    let new_order = NewOrder {
        user_id: username.to_string(),
        items,
        total_amount: round_money(total),
    };

    match state.orders.insert(new_order) {
        Ok(order) => Ok(order),
        Err(err) => {
            tracing::error!(error = %err, "order insert failed, releasing stock");
            if let Err(release_err) = state.products.release(&lines) {
                tracing::error!(error = %release_err, "stock release failed");
            }
            Err(OrderError::StockUpdateFailed)
        }
    }
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    guards::CLIENT.authorize(user)?;
    let orders = state.orders.list(&OrderFilter {
        user_id: Some(user.username.clone()),
        status: query.status,
    })?;
    let (items, meta) = paginate(orders, &query.pagination());
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

pub async fn get_order(state: &AppState, user: &AuthUser, id: i64) -> AppResult<ApiResponse<Order>> {
    guards::CLIENT.authorize(user)?;
    let order = state.orders.find_by_id(id)?;
    if order.user_id != user.username {
        return Err(AppError::NotFound(format!("Order with ID {id} not found")));
    }
    Ok(ApiResponse::success("OK", order, Some(Meta::empty())))
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    guards::BACK_OFFICE.authorize(user)?;
    let orders = state.orders.list(&OrderFilter {
        user_id: None,
        status: query.status,
    })?;
    let (items, meta) = paginate(orders, &query.pagination());
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::round_money;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_money(dec!(10.005)), dec!(10.01));
        assert_eq!(round_money(dec!(10.004)), dec!(10.00));
        assert_eq!(round_money(dec!(45200)), dec!(45200));
    }
}
