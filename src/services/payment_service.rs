use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::{Decimal, prelude::ToPrimitive};
use thiserror::Error;

use crate::{
    audit::log_audit,
    config::StripeConfig,
    dto::payments::{
        CheckoutSessionResponse, CreateCheckoutSessionRequest, PaymentRecordList, WebhookAck,
        WebhookOutcome,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, guards},
    models::{Order, OrderStatus, PaymentItemSnapshot, PaymentRecord, PaymentStatus},
    response::{ApiResponse, Meta},
    services::{
        order_service::round_money,
        payment_provider::{
            CheckoutLine, CheckoutSessionRequest, PaymentProvider, ProviderError, WebhookError,
            WebhookEvent,
        },
    },
    state::AppState,
    store::{NewPaymentRecord, SettleOutcome, Settlement, StockLine, StoreError},
};

pub const SESSION_COMPLETED: &str = "checkout.session.completed";
pub const ASYNC_PAYMENT_SUCCEEDED: &str = "checkout.session.async_payment_succeeded";
pub const ASYNC_PAYMENT_FAILED: &str = "checkout.session.async_payment_failed";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No valid items to create a checkout session")]
    NoItems,

    #[error("Quantity for product {0} must be greater than 0")]
    InvalidQuantity(i64),

    #[error("Product with ID {0} not found")]
    ProductNotFound(i64),

    #[error("Price for product {product_id} does not match the catalog price {catalog_price}")]
    PriceMismatch {
        product_id: i64,
        catalog_price: Decimal,
    },

    #[error("Price for product {0} cannot be expressed in minor units")]
    UnrepresentableAmount(i64),

    #[error("Order with ID {0} not found")]
    OrderNotFound(i64),

    #[error("Order {0} is not awaiting payment")]
    OrderNotPending(i64),

    #[error("Items do not match order {0}")]
    ItemsMismatch(i64),

    #[error("Order {0} already has a checkout session awaiting payment")]
    CheckoutPending(i64),

    #[error("Checkout total is too large")]
    AmountOverflow,

    #[error("Could not create the checkout session: {0}")]
    Provider(#[from] ProviderError),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NoItems
            | SessionError::InvalidQuantity(_)
            | SessionError::PriceMismatch { .. }
            | SessionError::UnrepresentableAmount(_)
            | SessionError::OrderNotPending(_)
            | SessionError::ItemsMismatch(_)
            | SessionError::AmountOverflow => AppError::BadRequest(err.to_string()),
            SessionError::CheckoutPending(_) => AppError::Conflict(err.to_string()),
            SessionError::ProductNotFound(_) | SessionError::OrderNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            SessionError::Provider(_) => AppError::Upstream(err.to_string()),
        }
    }
}

/// Settings the orchestrator needs besides the provider itself.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub success_url: String,
    pub cancel_url: String,
    pub currency: String,
    pub timeout: Duration,
}

impl CheckoutSettings {
    pub fn from_config(config: &StripeConfig, timeout: Duration) -> Self {
        Self {
            success_url: config.success_url.clone(),
            cancel_url: config.cancel_url.clone(),
            currency: config.currency.clone(),
            timeout,
        }
    }
}

pub struct PaymentGateway {
    provider: Arc<dyn PaymentProvider>,
    settings: CheckoutSettings,
}

impl PaymentGateway {
    pub fn new(provider: Arc<dyn PaymentProvider>, settings: CheckoutSettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &CheckoutSettings {
        &self.settings
    }
}

fn to_minor_units(product_id: i64, price: Decimal) -> Result<i64, SessionError> {
    price
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.round().to_i64())
        .ok_or(SessionError::UnrepresentableAmount(product_id))
}

type PricedItems = (Vec<CheckoutLine>, Vec<PaymentItemSnapshot>, Decimal);

/// Prices the session from the catalog, or from the linked order's captured
/// lines, opens a hosted checkout session and stores a pending payment record
/// keyed by the provider's session id.
pub async fn create_checkout_session(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCheckoutSessionRequest,
) -> AppResult<ApiResponse<CheckoutSessionResponse>> {
    guards::CLIENT.authorize(user)?;
    let gateway = state.payment_gateway()?;

    let (lines, snapshot, total) = match payload.order_id {
        Some(order_id) => {
            let order = state.orders.find_by_id(order_id).map_err(|err| match err {
                StoreError::NotFound { .. } => {
                    AppError::from(SessionError::OrderNotFound(order_id))
                }
                other => other.into(),
            })?;
            if order.user_id != user.username {
                return Err(SessionError::OrderNotFound(order_id).into());
            }
            if order.status != OrderStatus::Pending {
                return Err(SessionError::OrderNotPending(order_id).into());
            }
            if state.payments.pending_for_order(order_id)?.is_some() {
                return Err(SessionError::CheckoutPending(order_id).into());
            }
            price_order(state, &order, &payload)?
        }
        None => price_items(state, &payload)?,
    };

    let mut metadata = BTreeMap::new();
    metadata.insert("client_username".to_string(), user.username.clone());
    metadata.insert(
        "order_id".to_string(),
        payload
            .order_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "N/A".to_string()),
    );
    metadata.insert("total_amount".to_string(), total.to_string());
    if let Some(branch_id) = payload.branch_id {
        metadata.insert("branch_id".to_string(), branch_id.to_string());
    }

    let settings = &gateway.settings;
    let request = CheckoutSessionRequest {
        lines,
        currency: settings.currency.clone(),
        success_url: format!("{}?session_id={{CHECKOUT_SESSION_ID}}", settings.success_url),
        cancel_url: settings.cancel_url.clone(),
        metadata,
    };

    let session = tokio::time::timeout(
        settings.timeout,
        gateway.provider.create_checkout_session(request),
    )
    .await
    .map_err(|_| SessionError::Provider(ProviderError::Timeout))?
    .map_err(|err| {
        tracing::warn!(error = %err, "checkout session creation failed");
        SessionError::Provider(err)
    })?;

    let record = state.payments.insert(NewPaymentRecord {
        client_username: user.username.clone(),
        stripe_session_id: session.id.clone(),
        amount_total: total,
        currency: settings.currency.to_uppercase(),
        items_snapshot: snapshot,
        order_id: payload.order_id,
    })?;

    log_audit(
        Some(&user.username),
        "checkout_session_created",
        Some("payments"),
        Some(serde_json::json!({
            "payment_id": record.id,
            "session_id": record.stripe_session_id,
            "order_id": record.order_id,
            "amount_total": record.amount_total,
        })),
    );

    Ok(ApiResponse::success(
        "Checkout session created",
        CheckoutSessionResponse {
            checkout_url: session.url,
            session_id: session.id,
            amount_total: record.amount_total,
            currency: record.currency,
        },
        Some(Meta::empty()),
    ))
}

fn validate_items(payload: &CreateCheckoutSessionRequest) -> Result<(), SessionError> {
    if payload.items.is_empty() {
        return Err(SessionError::NoItems);
    }
    match payload.items.iter().find(|item| item.quantity <= 0) {
        Some(item) => Err(SessionError::InvalidQuantity(item.product_id)),
        None => Ok(()),
    }
}

fn price_line(
    product_id: i64,
    name: String,
    unit_price: Decimal,
    quantity: i32,
) -> Result<(CheckoutLine, PaymentItemSnapshot), SessionError> {
    let line = CheckoutLine {
        product_id,
        name: name.clone(),
        unit_amount: to_minor_units(product_id, unit_price)?,
        quantity,
    };
    let snapshot = PaymentItemSnapshot {
        product_id,
        name,
        unit_price,
        quantity,
    };
    Ok((line, snapshot))
}

fn add_line_total(total: Decimal, unit_price: Decimal, quantity: i32) -> Result<Decimal, SessionError> {
    unit_price
        .checked_mul(Decimal::from(quantity))
        .and_then(|line| total.checked_add(line))
        .ok_or(SessionError::AmountOverflow)
}

fn price_items(state: &AppState, payload: &CreateCheckoutSessionRequest) -> Result<PricedItems, AppError> {
    validate_items(payload)?;

    let mut lines = Vec::with_capacity(payload.items.len());
    let mut snapshot = Vec::with_capacity(payload.items.len());
    let mut total = Decimal::ZERO;

    for item in &payload.items {
        let product = state
            .products
            .find_by_id(item.product_id)
            .map_err(|err| match err {
                StoreError::NotFound { .. } => {
                    AppError::from(SessionError::ProductNotFound(item.product_id))
                }
                other => other.into(),
            })?;

        if item.price.is_some_and(|client_price| client_price != product.price) {
            return Err(SessionError::PriceMismatch {
                product_id: product.id,
                catalog_price: product.price,
            }
            .into());
        }

        total = add_line_total(total, product.price, item.quantity)?;
        let (line, snap) = price_line(product.id, product.name, product.price, item.quantity)?;
        lines.push(line);
        snapshot.push(snap);
    }

    Ok((lines, snapshot, round_money(total)))
}

fn quantities<I>(lines: I) -> BTreeMap<i64, i64>
where
    I: IntoIterator<Item = (i64, i32)>,
{
    let mut totals = BTreeMap::new();
    for (product_id, quantity) in lines {
        *totals.entry(product_id).or_insert(0) += i64::from(quantity);
    }
    totals
}

/// Charges exactly the order's lines at the prices captured when it was
/// placed. The requested items must describe the same products and
/// quantities.
fn price_order(
    state: &AppState,
    order: &Order,
    payload: &CreateCheckoutSessionRequest,
) -> Result<PricedItems, AppError> {
    validate_items(payload)?;

    let requested = quantities(payload.items.iter().map(|i| (i.product_id, i.quantity)));
    let ordered = quantities(order.items.iter().map(|i| (i.product_id, i.quantity)));
    if requested != ordered {
        return Err(SessionError::ItemsMismatch(order.id).into());
    }

    for item in &payload.items {
        let Some(client_price) = item.price else {
            continue;
        };
        let captured = order
            .items
            .iter()
            .find(|line| line.product_id == item.product_id)
            .map(|line| line.unit_price);
        if let Some(unit_price) = captured.filter(|p| *p != client_price) {
            return Err(SessionError::PriceMismatch {
                product_id: item.product_id,
                catalog_price: unit_price,
            }
            .into());
        }
    }

    let mut lines = Vec::with_capacity(order.items.len());
    let mut snapshot = Vec::with_capacity(order.items.len());
    for item in &order.items {
        let name = state.products.find_by_id(item.product_id)?.name;
        let (line, snap) = price_line(item.product_id, name, item.unit_price, item.quantity)?;
        lines.push(line);
        snapshot.push(snap);
    }

    Ok((lines, snapshot, order.total_amount))
}

/// Verifies an inbound provider event and folds it into the local payment
/// and order state. Redelivered events are acknowledged without effect.
pub async fn handle_webhook(
    state: &AppState,
    payload: &[u8],
    signature_header: Option<&str>,
) -> AppResult<WebhookAck> {
    let gateway = state.payment_gateway()?;
    let signature_header = signature_header.ok_or(WebhookError::MissingSignature)?;

    let event = gateway
        .provider
        .parse_event(payload, signature_header)
        .inspect_err(|err| tracing::warn!(error = %err, "webhook rejected"))?;

    tracing::info!(event_id = %event.id, event_type = %event.event_type, "webhook received");
    reconcile(state, &event)
}

/// What a verified event asks reconciliation to do.
enum EventAction {
    Ignore,
    /// Session completed with a delayed payment method; a later
    /// `async_payment_*` event settles it.
    AwaitPayment(String),
    Settle(String, Settlement),
}

fn action_for(event: &WebhookEvent) -> Result<EventAction, WebhookError> {
    let status = match event.event_type.as_str() {
        SESSION_COMPLETED | ASYNC_PAYMENT_SUCCEEDED => PaymentStatus::Paid,
        ASYNC_PAYMENT_FAILED => PaymentStatus::Failed,
        _ => return Ok(EventAction::Ignore),
    };
    let session = event.checkout_session()?;

    if event.event_type == SESSION_COMPLETED {
        let settled = session
            .payment_status
            .as_deref()
            .is_none_or(|s| s == "paid" || s == "no_payment_required");
        if !settled {
            return Ok(EventAction::AwaitPayment(session.id));
        }
    }

    Ok(EventAction::Settle(
        session.id,
        Settlement {
            status,
            payment_intent_id: session.payment_intent,
            amount_total: session.amount_total.map(|cents| Decimal::new(cents, 2)),
            currency: session.currency,
        },
    ))
}

pub fn reconcile(state: &AppState, event: &WebhookEvent) -> AppResult<WebhookAck> {
    let ack = |outcome: WebhookOutcome, payment_status: Option<PaymentStatus>| WebhookAck {
        received: true,
        event_type: event.event_type.clone(),
        outcome,
        payment_status,
    };

    let (session_id, settlement) = match action_for(event)? {
        EventAction::Ignore => {
            tracing::info!(event_type = %event.event_type, "webhook event ignored");
            return Ok(ack(WebhookOutcome::Ignored, None));
        }
        EventAction::AwaitPayment(session_id) => {
            let current = state.payments.find_by_session(&session_id)?;
            tracing::info!(%session_id, "checkout completed, awaiting payment confirmation");
            return Ok(ack(
                WebhookOutcome::AwaitingPayment,
                current.map(|r| r.status),
            ));
        }
        EventAction::Settle(session_id, settlement) => (session_id, settlement),
    };

    match state.payments.settle(&session_id, settlement)? {
        SettleOutcome::UnknownSession => {
            tracing::warn!(%session_id, "webhook for unknown checkout session");
            Ok(ack(WebhookOutcome::UnknownSession, None))
        }
        SettleOutcome::AlreadySettled(record) => {
            tracing::info!(%session_id, status = ?record.status, "duplicate webhook delivery");
            Ok(ack(WebhookOutcome::Duplicate, Some(record.status)))
        }
        SettleOutcome::Settled(record) => {
            settle_linked_order(state, &record)?;
            log_audit(
                Some(&record.client_username),
                "payment_reconciled",
                Some("payments"),
                Some(serde_json::json!({
                    "payment_id": record.id,
                    "session_id": record.stripe_session_id,
                    "status": record.status,
                    "order_id": record.order_id,
                })),
            );
            Ok(ack(WebhookOutcome::Settled, Some(record.status)))
        }
    }
}

/// Paid payments mark the order paid; failed ones cancel it and return the
/// reserved stock.
fn settle_linked_order(state: &AppState, record: &PaymentRecord) -> AppResult<()> {
    let Some(order_id) = record.order_id else {
        return Ok(());
    };
    let target = match record.status {
        PaymentStatus::Paid => OrderStatus::Paid,
        PaymentStatus::Failed => OrderStatus::Cancelled,
        PaymentStatus::Pending => return Ok(()),
    };

    let order = match state.orders.transition(order_id, target) {
        Ok(Some(order)) => order,
        Ok(None) => {
            tracing::warn!(order_id, ?target, "linked order already left pending");
            return Ok(());
        }
        Err(StoreError::NotFound { .. }) => {
            tracing::warn!(order_id, "payment linked to a missing order");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    if order.status == OrderStatus::Cancelled {
        let lines: Vec<StockLine> = order.items.iter().map(StockLine::from).collect();
        state.products.release(&lines)?;
    }
    Ok(())
}

pub async fn list_records(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<PaymentRecordList>> {
    guards::BACK_OFFICE.authorize(user)?;
    state.payment_gateway()?;
    let items = state.payments.list()?;
    let meta = Meta::total(items.len());
    Ok(ApiResponse::success(
        "Payment records",
        PaymentRecordList { items },
        Some(meta),
    ))
}

pub fn find_record(state: &AppState, session_id: &str) -> AppResult<Option<PaymentRecord>> {
    state.payment_gateway()?;
    Ok(state.payments.find_by_session(session_id)?)
}
