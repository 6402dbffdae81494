use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    config::ExchangeRateConfig,
    dto::currency::{ConversionResult, ConvertQuery},
    error::{AppError, AppResult},
    services::order_service::round_money,
    state::AppState,
};

#[derive(Debug, Error)]
pub enum RateError {
    #[error("rate provider request timed out")]
    Timeout,

    #[error("rate provider unreachable: {0}")]
    Transport(String),

    #[error("rate provider returned status {0}")]
    Status(u16),

    #[error("rate provider reported '{0}'")]
    Rejected(String),

    #[error("rate provider returned an unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl From<reqwest::Error> for RateError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RateError::Timeout
        } else if err.is_decode() {
            RateError::UnexpectedResponse(err.to_string())
        } else {
            RateError::Transport(err.to_string())
        }
    }
}

impl From<RateError> for AppError {
    fn from(err: RateError) -> Self {
        AppError::Upstream(format!("Error fetching exchange rates: {err}"))
    }
}

/// Source of USD-based exchange rates keyed by ISO 4217 code.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn latest_rates(&self) -> Result<HashMap<String, Decimal>, RateError>;
}

pub struct ExchangeRateApi {
    http: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct LatestRates {
    result: String,
    #[serde(default)]
    conversion_rates: HashMap<String, Decimal>,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
}

impl ExchangeRateApi {
    pub fn new(config: &ExchangeRateConfig, timeout: Duration) -> Result<Self, RateError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: config.latest_usd_url(),
        })
    }
}

#[async_trait]
impl RateProvider for ExchangeRateApi {
    #[tracing::instrument(skip_all)]
    async fn latest_rates(&self) -> Result<HashMap<String, Decimal>, RateError> {
        let response = self.http.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RateError::Status(status.as_u16()));
        }

        let body: LatestRates = response.json().await?;
        if body.result != "success" {
            return Err(RateError::Rejected(
                body.error_type.unwrap_or(body.result),
            ));
        }
        Ok(body.conversion_rates)
    }
}

pub struct CurrencyConverter {
    provider: Arc<dyn RateProvider>,
    timeout: Duration,
}

impl CurrencyConverter {
    pub fn new(provider: Arc<dyn RateProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub async fn convert(
        &self,
        amount: Decimal,
        from_currency: &str,
        to_currency: &str,
    ) -> AppResult<ConversionResult> {
        if amount <= Decimal::ZERO {
            return Err(AppError::BadRequest("Amount must be greater than 0".into()));
        }
        let from = normalize_code(from_currency)?;
        let to = normalize_code(to_currency)?;

        let rates = tokio::time::timeout(self.timeout, self.provider.latest_rates())
            .await
            .map_err(|_| RateError::Timeout)?
            .inspect_err(|err| tracing::warn!(error = %err, "exchange rate lookup failed"))?;

        let rate_of = |code: &str| {
            rates
                .get(code)
                .copied()
                .filter(|rate| *rate > Decimal::ZERO)
                .ok_or_else(|| AppError::BadRequest(format!("Currency not supported: {code}")))
        };
        let from_rate = rate_of(&from)?;
        let to_rate = rate_of(&to)?;

        let converted = amount
            .checked_div(from_rate)
            .and_then(|usd| usd.checked_mul(to_rate))
            .ok_or_else(|| AppError::BadRequest("Amount out of range for conversion".into()))?;

        Ok(ConversionResult {
            amount,
            from_currency: from,
            to_currency: to,
            converted_amount: round_money(converted),
        })
    }
}

fn normalize_code(code: &str) -> AppResult<String> {
    let code = code.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::BadRequest(format!(
            "Invalid currency code '{code}'. Use a 3-letter ISO code"
        )));
    }
    Ok(code.to_ascii_uppercase())
}

pub async fn convert_currency(state: &AppState, query: ConvertQuery) -> AppResult<ConversionResult> {
    let converter = state.currency_converter()?;
    converter
        .convert(query.amount, &query.from_currency, &query.to_currency)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_codes() {
        assert_eq!(normalize_code(" usd ").unwrap(), "USD");
        assert!(normalize_code("US").is_err());
        assert!(normalize_code("U5D").is_err());
        assert!(normalize_code("EURO").is_err());
    }
}
