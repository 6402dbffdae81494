#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use ferremas_api::{
    middleware::auth::AuthUser,
    models::Role,
    seed,
    services::{
        auth_service::TokenService,
        currency_service::{CurrencyConverter, RateError, RateProvider},
        payment_provider::{
            CheckoutSession, CheckoutSessionRequest, PaymentProvider, ProviderError, WebhookError,
            WebhookEvent,
        },
        payment_service::{CheckoutSettings, PaymentGateway},
        stripe,
    },
    state::AppState,
    store::UserDirectory,
};

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

pub const CLIENT: &str = "ignacio_tapia";
pub const CLIENT_PASSWORD: &str = "f7rWChmQS1JYfThT";
pub const MANTENEDOR: &str = "javier_thompson";
pub const SERVICE_ACCOUNT: &str = "stripe_sa";
pub const ADMIN: &str = "admin_ferremas";

// Hashing is slow; share one directory per test binary.
fn demo_users() -> UserDirectory {
    static USERS: OnceLock<UserDirectory> = OnceLock::new();
    USERS
        .get_or_init(|| seed::demo_users().expect("hash demo users"))
        .clone()
}

/// Seeded catalog and directory, payments and currency disabled.
pub fn test_state() -> AppState {
    let state = AppState::new(TokenService::new(JWT_SECRET, 30), demo_users())
        .with_directory(seed::demo_directory());
    seed::seed_catalog(state.products.as_ref()).expect("seed catalog");
    state
}

pub fn auth_user(username: &str) -> AuthUser {
    let role = seed::DEMO_ACCOUNTS
        .iter()
        .find(|(name, _, _)| *name == username)
        .map(|(_, role, _)| *role)
        .expect("demo account");
    AuthUser {
        username: username.to_string(),
        role,
    }
}

pub fn other_client() -> AuthUser {
    AuthUser {
        username: "otra_clienta".to_string(),
        role: Role::Client,
    }
}

pub fn bearer(state: &AppState, username: &str) -> String {
    let user = state.users.find(username).expect("known user");
    format!("Bearer {}", state.tokens.issue(user).expect("token"))
}

/// Records every session request and verifies webhooks with `WEBHOOK_SECRET`.
#[derive(Default)]
pub struct FakeProvider {
    pub requests: Mutex<Vec<CheckoutSessionRequest>>,
    counter: AtomicUsize,
    fail: bool,
}

impl FakeProvider {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentProvider for FakeProvider {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, ProviderError> {
        if self.fail {
            return Err(ProviderError::Rejected {
                status: 402,
                message: "card declined".into(),
            });
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request);
        let id = format!("cs_test_{n}");
        Ok(CheckoutSession {
            url: format!("https://checkout.example.test/pay/{id}"),
            id,
        })
    }

    fn parse_event(&self, payload: &[u8], signature_header: &str) -> Result<WebhookEvent, WebhookError> {
        stripe::parse_signed_event(
            payload,
            signature_header,
            WEBHOOK_SECRET,
            300,
            chrono::Utc::now().timestamp(),
        )
    }
}

pub fn with_payments(state: AppState, provider: Arc<FakeProvider>) -> AppState {
    let settings = CheckoutSettings {
        success_url: "http://localhost:8000/payments/success".into(),
        cancel_url: "http://localhost:8000/payments/cancel".into(),
        currency: "usd".into(),
        timeout: Duration::from_secs(5),
    };
    state.with_payment_gateway(PaymentGateway::new(provider, settings))
}

/// A checkout session event signed the way the provider signs deliveries.
pub fn signed_event(
    event_type: &str,
    session_id: &str,
    payment_status: &str,
    secret: &str,
) -> (Vec<u8>, String) {
    let payload = serde_json::json!({
        "id": format!("evt_{session_id}_{event_type}"),
        "type": event_type,
        "data": {
            "object": {
                "id": session_id,
                "payment_intent": "pi_test_1",
                "amount_total": 4_520_000,
                "currency": "usd",
                "payment_status": payment_status,
            }
        }
    });
    let body = serde_json::to_vec(&payload).unwrap();
    let header = stripe::sign_payload(&body, secret, chrono::Utc::now().timestamp()).unwrap();
    (body, header)
}

pub struct FakeRates {
    fail: bool,
}

impl FakeRates {
    pub fn working() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl RateProvider for FakeRates {
    async fn latest_rates(&self) -> Result<HashMap<String, Decimal>, RateError> {
        if self.fail {
            return Err(RateError::Rejected("invalid-key".into()));
        }
        Ok(HashMap::from([
            ("USD".to_string(), dec!(1)),
            ("CLP".to_string(), dec!(950)),
            ("EUR".to_string(), dec!(0.92)),
        ]))
    }
}

pub fn with_currency(state: AppState, rates: FakeRates) -> AppState {
    state.with_currency(CurrencyConverter::new(Arc::new(rates), Duration::from_secs(5)))
}
