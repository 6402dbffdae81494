use std::{env, fmt, time::Duration};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub provider_timeout: Duration,
    pub seed_demo_data: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = required("JWT_SECRET")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parsed_or("APP_PORT", 8000)?;
        let token_ttl_minutes = parsed_or("ACCESS_TOKEN_EXPIRE_MINUTES", 30)?;
        let provider_timeout = Duration::from_secs(parsed_or("PROVIDER_TIMEOUT_SECS", 10)?);
        let seed_demo_data = parsed_or("SEED_DEMO_DATA", true)?;
        Ok(Self {
            host,
            port,
            jwt_secret,
            token_ttl_minutes,
            provider_timeout,
            seed_demo_data,
        })
    }
}

/// Credentials and redirect targets for the hosted checkout provider.
#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub api_base: String,
    pub success_url: String,
    pub cancel_url: String,
    pub currency: String,
    pub webhook_tolerance_secs: i64,
}

impl StripeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            secret_key: required("STRIPE_SECRET_KEY")?,
            webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
            api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            success_url: env::var("STRIPE_SUCCESS_URL")
                .unwrap_or_else(|_| "http://localhost:8000/payments/success".to_string()),
            cancel_url: env::var("STRIPE_CANCEL_URL")
                .unwrap_or_else(|_| "http://localhost:8000/payments/cancel".to_string()),
            currency: env::var("PAYMENT_CURRENCY")
                .unwrap_or_else(|_| "usd".to_string())
                .to_lowercase(),
            webhook_tolerance_secs: parsed_or("STRIPE_WEBHOOK_TOLERANCE_SECS", 300)?,
        })
    }
}

impl fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"<redacted>")
            .field("webhook_secret", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("success_url", &self.success_url)
            .field("cancel_url", &self.cancel_url)
            .field("currency", &self.currency)
            .field("webhook_tolerance_secs", &self.webhook_tolerance_secs)
            .finish()
    }
}

#[derive(Clone)]
pub struct ExchangeRateConfig {
    pub api_key: String,
    pub api_base: String,
}

impl ExchangeRateConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: required("EXCHANGE_RATE_API_KEY")?,
            api_base: env::var("EXCHANGE_RATE_API_BASE")
                .unwrap_or_else(|_| "https://v6.exchangerate-api.com".to_string()),
        })
    }

    /// Latest rates endpoint, USD based.
    pub fn latest_usd_url(&self) -> String {
        format!("{}/v6/{}/latest/USD", self.api_base, self.api_key)
    }
}

impl fmt::Debug for ExchangeRateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeRateConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .finish()
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parsed_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
