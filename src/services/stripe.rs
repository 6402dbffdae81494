use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::config::StripeConfig;

use super::payment_provider::{
    CheckoutSession, CheckoutSessionRequest, PaymentProvider, ProviderError, WebhookError,
    WebhookEvent,
};

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    webhook_secret: String,
    api_base: String,
    tolerance_secs: i64,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl StripeClient {
    pub fn new(config: &StripeConfig, timeout: Duration) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            secret_key: config.secret_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            tolerance_secs: config.webhook_tolerance_secs,
        })
    }
}

/// Form fields for `POST /v1/checkout/sessions`.
fn session_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];
    for (i, line) in request.lines.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.push((
            format!("{prefix}[price_data][currency]"),
            request.currency.clone(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][name]"),
            line.name.clone(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][metadata][product_id]"),
            line.product_id.to_string(),
        ));
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            line.unit_amount.to_string(),
        ));
        form.push((format!("{prefix}[quantity]"), line.quantity.to_string()));
    }
    for (key, value) in &request.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }
    form
}

#[async_trait]
impl PaymentProvider for StripeClient {
    #[tracing::instrument(skip_all, fields(lines = request.lines.len()))]
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, ProviderError> {
        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .basic_auth(&self.secret_key, Some(""))
            .form(&session_form(&request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorEnvelope>()
                .await
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or_else(|| "no error message".to_string());
            tracing::warn!(status = status.as_u16(), %message, "checkout session rejected");
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let session: SessionResponse = response.json().await?;
        let url = session.url.ok_or_else(|| {
            ProviderError::UnexpectedResponse("checkout session has no url".into())
        })?;
        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }

    fn parse_event(&self, payload: &[u8], signature_header: &str) -> Result<WebhookEvent, WebhookError> {
        parse_signed_event(
            payload,
            signature_header,
            &self.webhook_secret,
            self.tolerance_secs,
            chrono::Utc::now().timestamp(),
        )
    }
}

/// Checks a `t=...,v1=...` signature header and parses the event body.
pub fn parse_signed_event(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<WebhookEvent, WebhookError> {
    verify_signature(payload, signature_header, secret, tolerance_secs, now)?;
    serde_json::from_slice(payload).map_err(|e| WebhookError::MalformedPayload(e.to_string()))
}

pub fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), WebhookError> {
    let mut timestamp: Option<&str> = None;
    let mut candidates: Vec<&str> = Vec::new();
    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::InvalidSignature)?;
    if candidates.is_empty() {
        return Err(WebhookError::InvalidSignature);
    }
    let issued_at: i64 = timestamp
        .parse()
        .map_err(|_| WebhookError::InvalidSignature)?;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = candidates.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err(WebhookError::InvalidSignature);
    }

    if (now - issued_at).abs() > tolerance_secs {
        return Err(WebhookError::StaleTimestamp);
    }
    Ok(())
}

/// Builds a header the way the provider signs deliveries.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, WebhookError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::services::payment_provider::CheckoutLine;

    const SECRET: &str = "whsec_test123secret456";
    const PAYLOAD: &[u8] =
        br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"id":"cs_1"}}}"#;

    #[test]
    fn accepts_valid_signature() {
        let header = sign_payload(PAYLOAD, SECRET, 1_700_000_000).unwrap();
        let event = parse_signed_event(PAYLOAD, &header, SECRET, 300, 1_700_000_010).unwrap();
        assert_eq!(event.event_type, "checkout.session.completed");
        assert_eq!(event.checkout_session().unwrap().id, "cs_1");
    }

    #[test]
    fn rejects_wrong_secret() {
        let header = sign_payload(PAYLOAD, "wrong_secret", 1_700_000_000).unwrap();
        assert_eq!(
            verify_signature(PAYLOAD, &header, SECRET, 300, 1_700_000_000),
            Err(WebhookError::InvalidSignature)
        );
    }

    #[test]
    fn rejects_modified_payload() {
        let header = sign_payload(PAYLOAD, SECRET, 1_700_000_000).unwrap();
        let tampered = br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"id":"cs_2"}}}"#;
        assert_eq!(
            verify_signature(tampered, &header, SECRET, 300, 1_700_000_000),
            Err(WebhookError::InvalidSignature)
        );
    }

    #[test]
    fn rejects_stale_timestamp() {
        let header = sign_payload(PAYLOAD, SECRET, 1_700_000_000).unwrap();
        assert_eq!(
            verify_signature(PAYLOAD, &header, SECRET, 300, 1_700_000_600),
            Err(WebhookError::StaleTimestamp)
        );
    }

    #[test]
    fn rejects_header_without_v1() {
        assert_eq!(
            verify_signature(PAYLOAD, "t=1700000000", SECRET, 300, 1_700_000_000),
            Err(WebhookError::InvalidSignature)
        );
    }

    #[test]
    fn accepts_any_matching_v1_candidate() {
        let valid = sign_payload(PAYLOAD, SECRET, 1_700_000_000).unwrap();
        let v1 = valid.split_once(",v1=").unwrap().1;
        let header = format!("t=1700000000,v1=deadbeef,v1={v1}");
        assert!(verify_signature(PAYLOAD, &header, SECRET, 300, 1_700_000_000).is_ok());
    }

    #[test]
    fn session_form_encodes_lines_and_metadata() {
        let mut metadata = BTreeMap::new();
        metadata.insert("order_id".to_string(), "7".to_string());
        let form = session_form(&CheckoutSessionRequest {
            lines: vec![CheckoutLine {
                product_id: 2,
                name: "Taladro".into(),
                unit_amount: 4_520_000,
                quantity: 1,
            }],
            currency: "usd".into(),
            success_url: "http://localhost/success?session_id={CHECKOUT_SESSION_ID}".into(),
            cancel_url: "http://localhost/cancel".into(),
            metadata,
        });

        let get = |key: &str| {
            form.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("4520000"));
        assert_eq!(get("line_items[0][quantity]"), Some("1"));
        assert_eq!(get("metadata[order_id]"), Some("7"));
    }
}
