mod common;

use axum::http::StatusCode;
use rust_decimal_macros::dec;

use ferremas_api::{dto::currency::ConvertQuery, services::currency_service::convert_currency};

use common::{FakeRates, test_state, with_currency};

fn query(amount: rust_decimal::Decimal, from: &str, to: &str) -> ConvertQuery {
    ConvertQuery {
        amount,
        from_currency: from.to_string(),
        to_currency: to.to_string(),
    }
}

#[tokio::test]
async fn converts_through_usd_rates() -> anyhow::Result<()> {
    let state = with_currency(test_state(), FakeRates::working());

    let result = convert_currency(&state, query(dec!(100), "usd", "clp")).await?;
    assert_eq!(result.from_currency, "USD");
    assert_eq!(result.to_currency, "CLP");
    assert_eq!(result.converted_amount, dec!(95000));

    // 45200 / 950 * 0.92 = 43.7726...
    let result = convert_currency(&state, query(dec!(45200), "CLP", "EUR")).await?;
    assert_eq!(result.converted_amount, dec!(43.77));
    assert_eq!(result.amount, dec!(45200));
    Ok(())
}

#[tokio::test]
async fn rejects_bad_input_before_calling_the_provider() {
    let state = with_currency(test_state(), FakeRates::failing());

    for bad in [
        query(dec!(0), "USD", "CLP"),
        query(dec!(-5), "USD", "CLP"),
        query(dec!(10), "US", "CLP"),
        query(dec!(10), "USD", "CL1"),
    ] {
        let err = convert_currency(&state, bad).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn unsupported_currency_is_a_validation_error() {
    let state = with_currency(test_state(), FakeRates::working());

    let err = convert_currency(&state, query(dec!(10), "USD", "XYZ"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert!(err.to_string().contains("XYZ"));
}

#[tokio::test]
async fn provider_failure_and_missing_configuration() {
    let state = with_currency(test_state(), FakeRates::failing());
    let err = convert_currency(&state, query(dec!(10), "USD", "CLP"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.kind(), "upstream");

    let err = convert_currency(&test_state(), query(dec!(10), "USD", "CLP"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
}
