//! Graph API Send client.
//!
//! `POST {graph_api_base}/{api_version}/me/messages?access_token=...` with
//! `{ "recipient": { "id": ... }, "message": { "text": ... } }`.  The same
//! endpoint serves Messenger and Instagram recipients of the page.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use dm_domain::config::MessengerConfig;
use dm_domain::error::{Error, Result};

use crate::dispatch::MessageDispatcher;

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    recipient: Recipient<'a>,
    message: MessageBody<'a>,
}

#[derive(Debug, Serialize)]
struct Recipient<'a> {
    id: &'a str,
}

#[derive(Debug, Serialize)]
struct MessageBody<'a> {
    text: &'a str,
}

/// Sends through the Graph API with a page access token.
///
/// Sends are never retried: a retry after an ambiguous failure could
/// deliver the same message twice.
#[derive(Clone)]
pub struct GraphApiDispatcher {
    http: Client,
    endpoint: String,
    access_token: String,
}

impl std::fmt::Debug for GraphApiDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphApiDispatcher")
            .field("endpoint", &self.endpoint)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl GraphApiDispatcher {
    pub fn new(cfg: &MessengerConfig, access_token: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.send_timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: messages_endpoint(&cfg.graph_api_base, &cfg.api_version),
            access_token: access_token.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

pub fn messages_endpoint(base: &str, version: &str) -> String {
    format!(
        "{}/{}/me/messages",
        base.trim_end_matches('/'),
        version.trim_matches('/')
    )
}

#[async_trait]
impl MessageDispatcher for GraphApiDispatcher {
    fn name(&self) -> &str {
        "graph"
    }

    async fn send(&self, recipient_id: &str, text: &str) -> Result<()> {
        let payload = SendRequest {
            recipient: Recipient { id: recipient_id },
            message: MessageBody { text },
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .query(&[("access_token", self.access_token.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(Error::Delivery {
            recipient: recipient_id.to_owned(),
            message: format!("send API returned {}: {body}", status.as_u16()),
        })
    }
}

/// Map a transport error without leaking the access token in the URL.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    let e = e.without_url();
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_and_version() {
        assert_eq!(
            messages_endpoint("https://graph.facebook.com/", "v20.0"),
            "https://graph.facebook.com/v20.0/me/messages"
        );
    }

    #[test]
    fn payload_shape() {
        let payload = SendRequest {
            recipient: Recipient { id: "123" },
            message: MessageBody { text: "oi" },
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({ "recipient": { "id": "123" }, "message": { "text": "oi" } })
        );
    }

    #[test]
    fn debug_redacts_token() {
        let d = GraphApiDispatcher::new(&MessengerConfig::default(), "secret-token").unwrap();
        let dbg = format!("{d:?}");
        assert!(!dbg.contains("secret-token"));
        assert!(dbg.contains("/v20.0/me/messages"));
    }
}
