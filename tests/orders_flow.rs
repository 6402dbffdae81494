mod common;

use axum::http::StatusCode;
use rust_decimal_macros::dec;

use ferremas_api::{
    dto::orders::{CreateOrderRequest, OrderLineRequest},
    error::AppError,
    models::{NewProduct, OrderStatus},
    routes::params::OrderListQuery,
    services::{order_service, product_service},
    state::AppState,
};

use common::{CLIENT, MANTENEDOR, SERVICE_ACCOUNT, auth_user, other_client, test_state};

fn order(lines: &[(i64, i32)]) -> CreateOrderRequest {
    CreateOrderRequest {
        items: lines
            .iter()
            .map(|&(product_id, quantity)| OrderLineRequest {
                product_id,
                quantity,
            })
            .collect(),
    }
}

async fn add_product(state: &AppState, code: &str, price: rust_decimal::Decimal, stock: i32) -> i64 {
    let resp = product_service::create_product(
        state,
        &auth_user(MANTENEDOR),
        NewProduct {
            name: format!("Producto {code}"),
            description: None,
            price,
            model: None,
            brand: None,
            code: code.to_string(),
            stock,
            is_promo: false,
            is_new: false,
        },
    )
    .await
    .expect("create product");
    resp.data.expect("product").id
}

fn stock_of(state: &AppState, id: i64) -> i32 {
    state.products.find_by_id(id).expect("product").stock
}

#[tokio::test]
async fn order_decrements_stock_and_totals_catalog_prices() -> anyhow::Result<()> {
    let state = test_state();
    let client = auth_user(CLIENT);

    let resp = order_service::place_order(&state, &client, order(&[(1, 2), (4, 3)])).await?;
    let placed = resp.data.expect("order");

    assert_eq!(placed.status, OrderStatus::Pending);
    assert_eq!(placed.user_id, CLIENT);
    assert_eq!(placed.total_amount, dec!(24600));
    assert_eq!(placed.items[0].unit_price, dec!(7500));
    assert_eq!(stock_of(&state, 1), 118);
    assert_eq!(stock_of(&state, 4), 197);
    Ok(())
}

#[tokio::test]
async fn total_is_rounded_once_after_summing() -> anyhow::Result<()> {
    let state = test_state();
    let id = add_product(&state, "CEN001", dec!(0.335), 10).await;

    let resp = order_service::place_order(&state, &auth_user(CLIENT), order(&[(id, 3)])).await?;

    // 3 x 0.335 = 1.005, which rounds half away from zero.
    assert_eq!(resp.data.expect("order").total_amount, dec!(1.01));
    Ok(())
}

#[tokio::test]
async fn insufficient_stock_leaves_stock_untouched() {
    let state = test_state();
    let id = add_product(&state, "TST005", dec!(1000), 5).await;

    let err = order_service::place_order(&state, &auth_user(CLIENT), order(&[(id, 6)]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::InsufficientStock { available: 5, .. }
    ));
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(err.kind(), "insufficient_stock");
    assert_eq!(stock_of(&state, id), 5);
}

#[tokio::test]
async fn total_overflow_is_rejected_without_touching_stock() {
    let state = test_state();
    let id = add_product(&state, "MAX001", rust_decimal::Decimal::MAX, 10).await;

    let err = order_service::place_order(&state, &auth_user(CLIENT), order(&[(id, 2)]))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(stock_of(&state, id), 10);

    let err = order_service::place_order(&state, &auth_user(CLIENT), order(&[(id, 1), (id, 1)]))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(stock_of(&state, id), 10);
}

#[tokio::test]
async fn multi_line_order_is_all_or_nothing() {
    let state = test_state();
    let scarce = add_product(&state, "TST006", dec!(1000), 5).await;

    let err = order_service::place_order(&state, &auth_user(CLIENT), order(&[(1, 1), (scarce, 6)]))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InsufficientStock { .. }));
    assert_eq!(stock_of(&state, 1), 120);
    assert_eq!(stock_of(&state, scarce), 5);
    assert!(state.orders.list(&Default::default()).unwrap().is_empty());
}

#[tokio::test]
async fn repeated_lines_count_against_combined_stock() {
    let state = test_state();
    let id = add_product(&state, "TST007", dec!(1000), 5).await;

    let err = order_service::place_order(&state, &auth_user(CLIENT), order(&[(id, 3), (id, 3)]))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InsufficientStock { available: 2, .. }));
    assert_eq!(stock_of(&state, id), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_orders_for_last_unit_admit_exactly_one() {
    let state = test_state();
    let id = add_product(&state, "ULT001", dec!(1000), 1).await;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            order_service::place_order(&state, &auth_user(CLIENT), order(&[(id, 1)])).await
        }));
    }

    let mut placed = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.expect("task") {
            Ok(_) => placed += 1,
            Err(AppError::InsufficientStock { .. }) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!((placed, rejected), (1, 1));
    assert_eq!(stock_of(&state, id), 0);
}

#[tokio::test]
async fn empty_order_and_unknown_product_are_rejected() {
    let state = test_state();
    let client = auth_user(CLIENT);

    let err = order_service::place_order(&state, &client, order(&[]))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let err = order_service::place_order(&state, &client, order(&[(999, 1)]))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);

    let err = order_service::place_order(&state, &client, order(&[(1, 0)]))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn only_clients_place_orders() {
    let state = test_state();
    let err = order_service::place_order(&state, &auth_user(MANTENEDOR), order(&[(1, 1)]))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
    assert_eq!(stock_of(&state, 1), 120);
}

#[tokio::test]
async fn clients_only_see_their_own_orders() -> anyhow::Result<()> {
    let state = test_state();
    let client = auth_user(CLIENT);
    let other = other_client();

    let mine = order_service::place_order(&state, &client, order(&[(1, 1)]))
        .await?
        .data
        .expect("order");
    order_service::place_order(&state, &other, order(&[(2, 1)])).await?;

    let listed = order_service::list_orders(&state, &client, OrderListQuery::default())
        .await?
        .data
        .expect("orders");
    assert_eq!(listed.items.len(), 1);
    assert_eq!(listed.items[0].id, mine.id);

    let err = order_service::get_order(&state, &other, mine.id)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);

    let all = order_service::list_all_orders(&state, &auth_user(SERVICE_ACCOUNT), OrderListQuery::default())
        .await?;
    let meta = all.meta.expect("meta");
    assert_eq!(meta.total, Some(2));
    // Newest first.
    assert_eq!(all.data.expect("orders").items[1].id, mine.id);

    let err = order_service::list_all_orders(&state, &client, OrderListQuery::default())
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
    Ok(())
}
