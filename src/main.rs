use axum::{
    Json, Router,
    http::{HeaderName, Request, Response, StatusCode, Uri},
    routing::get,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use std::{net::SocketAddr, sync::Arc, time::Duration};

use ferremas_api::{
    config::{AppConfig, ExchangeRateConfig, StripeConfig},
    response::{ApiResponse, Meta},
    routes::{create_api_router, doc::scalar_docs, health},
    seed,
    services::{
        auth_service::TokenService,
        currency_service::{CurrencyConverter, ExchangeRateApi},
        payment_service::{CheckoutSettings, PaymentGateway},
        stripe::StripeClient,
    },
    state::AppState,
    store::UserDirectory,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ferremas_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let state = build_state(&config)?;

    let api_router = create_api_router();
    let concurrency_limit_layer = ConcurrencyLimitLayer::new(100);

    let request_id_header = HeaderName::from_static("x-request-id");
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<_>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id
            )
        })
        .on_request(|request: &Request<_>, _span: &tracing::Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "request started"
            );
        })
        .on_response(|response: &Response<_>, latency: Duration, _span: &tracing::Span| {
            tracing::info!(
                status = %response.status(),
                ms = %latency.as_millis(),
                "request finished"
            );
        });

    let app = Router::new()
        .route("/health", get(health::health_check))
        .merge(api_router)
        .merge(scalar_docs())
        .fallback(not_found)
        .layer(trace_layer)
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .layer(concurrency_limit_layer)
        .with_state(state);

    let addr = SocketAddr::from((config.host.parse::<std::net::IpAddr>()?, config.port));
    tracing::info!("listening on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}

fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let tokens = TokenService::new(config.jwt_secret.clone(), config.token_ttl_minutes);

    let users = if config.seed_demo_data {
        seed::demo_users()?
    } else {
        UserDirectory::new()
    };
    tracing::info!(accounts = users.len(), "identity store ready");

    let mut state = AppState::new(tokens, users);
    if config.seed_demo_data {
        seed::seed_catalog(state.products.as_ref())?;
        state = state.with_directory(seed::demo_directory());
    }

    match StripeConfig::from_env() {
        Ok(stripe) => match StripeClient::new(&stripe, config.provider_timeout) {
            Ok(client) => {
                let settings = CheckoutSettings::from_config(&stripe, config.provider_timeout);
                state = state.with_payment_gateway(PaymentGateway::new(Arc::new(client), settings));
                tracing::info!(currency = %stripe.currency, "payments enabled");
            }
            Err(err) => tracing::warn!(error = %err, "payments disabled: client setup failed"),
        },
        Err(err) => tracing::warn!(error = %err, "payments disabled"),
    }

    match ExchangeRateConfig::from_env() {
        Ok(rates) => match ExchangeRateApi::new(&rates, config.provider_timeout) {
            Ok(api) => {
                state = state
                    .with_currency(CurrencyConverter::new(Arc::new(api), config.provider_timeout));
                tracing::info!("currency conversion enabled");
            }
            Err(err) => tracing::warn!(error = %err, "currency conversion disabled: client setup failed"),
        },
        Err(err) => tracing::warn!(error = %err, "currency conversion disabled"),
    }

    Ok(state)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    let body = ApiResponse::success(
        "Not Found",
        serde_json::json!({ "path": uri.path() }),
        Some(Meta::empty()),
    );
    (StatusCode::NOT_FOUND, Json(body))
}
