use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::Html,
    routing::{get, post},
};

use crate::{
    dto::payments::{
        CheckoutSessionResponse, CreateCheckoutSessionRequest, PaymentRecordList, SuccessQuery,
        WebhookAck,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::PaymentStatus,
    response::ApiResponse,
    services::payment_service,
    state::AppState,
};

const SIGNATURE_HEADER: &str = "stripe-signature";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-checkout-session", post(create_checkout_session))
        .route("/success", get(payment_success))
        .route("/cancel", get(payment_cancel))
        .route("/webhook", post(webhook))
        .route("/records", get(list_records))
}

#[utoipa::path(
    post,
    path = "/payments/create-checkout-session",
    request_body = CreateCheckoutSessionRequest,
    responses(
        (status = 200, description = "Hosted checkout session", body = ApiResponse<CheckoutSessionResponse>),
        (status = 400, description = "Invalid items or price mismatch"),
        (status = 500, description = "Payment provider failure"),
        (status = 503, description = "Payments not configured")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCheckoutSessionRequest>,
) -> AppResult<Json<ApiResponse<CheckoutSessionResponse>>> {
    let resp = payment_service::create_checkout_session(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/payments/success",
    params(("session_id" = String, Query, description = "Checkout session id")),
    responses(
        (status = 200, description = "Payment confirmed", body = String, content_type = "text/html"),
        (status = 202, description = "Payment still being confirmed", body = String, content_type = "text/html")
    ),
    tag = "Payments"
)]
pub async fn payment_success(
    State(state): State<AppState>,
    Query(query): Query<SuccessQuery>,
) -> AppResult<(StatusCode, Html<String>)> {
    let record = payment_service::find_record(&state, &query.session_id)?;
    let session_id = escape_html(&query.session_id);

    let response = match record.map(|r| r.status) {
        Some(PaymentStatus::Paid) => (
            StatusCode::OK,
            page(
                "Pago exitoso",
                &format!("Tu pago fue confirmado. Sesión: <code>{session_id}</code>"),
            ),
        ),
        Some(PaymentStatus::Failed) => (
            StatusCode::OK,
            page(
                "Pago rechazado",
                &format!("No pudimos procesar tu pago. Sesión: <code>{session_id}</code>"),
            ),
        ),
        _ => (
            StatusCode::ACCEPTED,
            page(
                "Pago en proceso",
                &format!("Estamos confirmando tu pago. Sesión: <code>{session_id}</code>"),
            ),
        ),
    };
    Ok(response)
}

#[utoipa::path(
    get,
    path = "/payments/cancel",
    responses((status = 200, description = "Checkout cancelled", body = String, content_type = "text/html")),
    tag = "Payments"
)]
pub async fn payment_cancel() -> Html<String> {
    page(
        "Pago cancelado",
        "El pago fue cancelado. Puedes volver a intentarlo desde tu carrito.",
    )
}

#[utoipa::path(
    post,
    path = "/payments/webhook",
    request_body(content = String, description = "Raw provider event", content_type = "application/json"),
    params(("Stripe-Signature" = String, Header, description = "Provider signature header")),
    responses(
        (status = 200, description = "Event acknowledged", body = WebhookAck),
        (status = 400, description = "Bad signature or payload"),
        (status = 503, description = "Payments not configured")
    ),
    tag = "Payments"
)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<WebhookAck>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let ack = payment_service::handle_webhook(&state, &body, signature).await?;
    Ok(Json(ack))
}

#[utoipa::path(
    get,
    path = "/payments/records",
    responses(
        (status = 200, description = "All payment records", body = ApiResponse<PaymentRecordList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn list_records(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<PaymentRecordList>>> {
    let resp = payment_service::list_records(&state, &user).await?;
    Ok(Json(resp))
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html><html lang=\"es\"><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body><h1>{title}</h1><p>{body}</p></body></html>"
    ))
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape_html;

    #[test]
    fn escapes_markup_in_session_id() {
        assert_eq!(
            escape_html("<script>\"x\"</script>"),
            "&lt;script&gt;&quot;x&quot;&lt;/script&gt;"
        );
    }
}
