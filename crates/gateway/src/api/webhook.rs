//! Meta webhook endpoints.
//!
//! - `GET  /webhook`: subscription handshake: echo `hub.challenge` when
//!   `hub.mode=subscribe` and `hub.verify_token` matches.
//! - `POST /webhook`: message delivery.  With an app secret configured the
//!   body must carry a valid `X-Hub-Signature-256: sha256=<hex>`.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use dm_channels::{parse_webhook, WebhookObject};

use super::api_error;
use crate::runtime::process_events;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /webhook
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode", default)]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token", default)]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge", default)]
    pub challenge: Option<String>,
}

pub async fn verify(State(state): State<AppState>, Query(q): Query<VerifyQuery>) -> Response {
    let Some(expected) = state.verify_token.as_deref() else {
        tracing::warn!("webhook verification attempted but no verify token is configured");
        return StatusCode::FORBIDDEN.into_response();
    };

    let token_ok = q
        .verify_token
        .as_deref()
        .is_some_and(|t| bool::from(t.as_bytes().ct_eq(expected.as_bytes())));

    if q.mode.as_deref() == Some("subscribe") && token_ok {
        tracing::info!("webhook verified");
        return (StatusCode::OK, q.challenge.unwrap_or_default()).into_response();
    }

    tracing::warn!(mode = ?q.mode, "webhook verification rejected");
    StatusCode::FORBIDDEN.into_response()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /webhook
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Events are processed one after the other before answering, so replies
/// to a burst from one sender go out in arrival order.
pub async fn receive(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Some(secret) = state.app_secret.as_deref() {
        let signature = headers
            .get("x-hub-signature-256")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !signature_matches(secret, &body, signature) {
            tracing::warn!("webhook signature mismatch");
            return api_error(StatusCode::UNAUTHORIZED, "invalid webhook signature");
        }
    }

    let parsed = match parse_webhook(&body) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "unparseable webhook body");
            return api_error(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    if let WebhookObject::Other(object) = &parsed.object {
        tracing::debug!(object = %object, "ignoring webhook for unsupported object");
        return StatusCode::NOT_FOUND.into_response();
    }

    let outcome = process_events(&state, &parsed.events).await;
    for report in outcome.reports.iter().filter(|r| !r.is_complete()) {
        if let Err(e) = report.clone().into_result() {
            tracing::error!(error = %e, failed = report.failed.len(), "replies not delivered");
        }
    }
    tracing::debug!(
        events = parsed.events.len(),
        processed = outcome.processed,
        sent = outcome.sent(),
        undelivered = outcome.undelivered(),
        "webhook handled"
    );

    // Always 200 once parsed: sessions have already advanced.
    Json(json!({
        "ok": outcome.is_clean(),
        "events": parsed.events.len(),
        "processed": outcome.processed,
        "errored": outcome.errored,
        "sent": outcome.sent(),
        "failed": outcome.undelivered(),
    }))
    .into_response()
}

/// Check a GitHub-style `sha256=<hex>` signature over `body`.
pub fn signature_matches(secret: &str, body: &[u8], header: &str) -> bool {
    let provided = header.strip_prefix("sha256=").unwrap_or(header);
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let computed = hex::encode(mac.finalize().into_bytes());
    computed.as_bytes().ct_eq(provided.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn accepts_valid_signature() {
        let body = br#"{"object":"page"}"#;
        assert!(signature_matches("s3cret", body, &sign("s3cret", body)));
    }

    #[test]
    fn rejects_wrong_secret_and_tampered_body() {
        let body = br#"{"object":"page"}"#;
        let sig = sign("s3cret", body);
        assert!(!signature_matches("other", body, &sig));
        assert!(!signature_matches("s3cret", br#"{"object":"instagram"}"#, &sig));
        assert!(!signature_matches("s3cret", body, ""));
    }
}
