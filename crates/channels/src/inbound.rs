//! Meta webhook bodies and their normalization into inbound events.
//!
//! Both platforms post `{ "object": ..., "entry": [...] }`; the `object`
//! field selects the [`InboundAdapter`] that knows where the sender and the
//! text live for that platform.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use dm_domain::error::Result;
use dm_domain::Channel;

use crate::instagram::InstagramAdapter;
use crate::messenger::MessengerAdapter;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Normalized event
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One user message, platform details stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub channel: Channel,
    /// Page / Instagram account the message was sent to (the webhook
    /// entry id).
    pub page_id: Option<String>,
    pub sender_id: String,
    /// Message text or postback payload; empty for attachment-only messages.
    pub text: String,
}

/// Turns a webhook body into inbound events for one platform.
pub trait InboundAdapter: Send + Sync {
    /// Value of the body's `object` field this adapter handles.
    fn object(&self) -> &'static str;

    fn channel(&self) -> Channel;

    fn extract(&self, body: &WebhookBody) -> Vec<InboundEvent>;
}

/// The webhook `object` a body was addressed as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookObject {
    Page,
    Instagram,
    Other(String),
}

impl WebhookObject {
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

#[derive(Debug, Clone)]
pub struct ParsedWebhook {
    pub object: WebhookObject,
    pub events: Vec<InboundEvent>,
}

static MESSENGER: MessengerAdapter = MessengerAdapter;
static INSTAGRAM: InstagramAdapter = InstagramAdapter;

fn adapter_for(object: &str) -> Option<&'static dyn InboundAdapter> {
    [&MESSENGER as &dyn InboundAdapter, &INSTAGRAM]
        .into_iter()
        .find(|a| a.object() == object)
}

/// Parse a raw webhook body.
///
/// Bodies for objects other than `page` / `instagram` parse successfully
/// with no events and [`WebhookObject::Other`].
pub fn parse_webhook(body: &[u8]) -> Result<ParsedWebhook> {
    let body: WebhookBody = serde_json::from_slice(body)?;

    let Some(adapter) = adapter_for(&body.object) else {
        return Ok(ParsedWebhook {
            object: WebhookObject::Other(body.object),
            events: Vec::new(),
        });
    };

    let object = match adapter.channel() {
        Channel::Messenger => WebhookObject::Page,
        Channel::Instagram => WebhookObject::Instagram,
    };
    let events = adapter.extract(&body);
    tracing::debug!(
        object = %body.object,
        entries = body.entry.len(),
        events = events.len(),
        "parsed webhook body"
    );

    Ok(ParsedWebhook { object, events })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire shapes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Default, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookEntry {
    #[serde(default, deserialize_with = "d_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub messaging: Vec<MessagingEvent>,
    #[serde(default)]
    pub changes: Vec<Change>,
}

/// Send API style event, used by Messenger and by Instagram messaging.
#[derive(Debug, Default, Deserialize)]
pub struct MessagingEvent {
    #[serde(default)]
    pub sender: Option<Party>,
    #[serde(default)]
    pub recipient: Option<Party>,
    #[serde(default)]
    pub message: Option<MessagePart>,
    #[serde(default)]
    pub postback: Option<Postback>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Party {
    #[serde(default, deserialize_with = "d_id")]
    pub id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessagePart {
    #[serde(default)]
    pub text: Option<String>,
    /// Set on copies of messages the page itself sent.
    #[serde(default)]
    pub is_echo: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct Postback {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub payload: Option<String>,
}

/// Instagram `changes[]` item.
#[derive(Debug, Default, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub value: Option<ChangeValue>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messages: Vec<ChangeMessage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangeMessage {
    #[serde(default)]
    pub from: Option<ChangeSender>,
    #[serde(default)]
    pub text: Option<String>,
}

/// `from` arrives either as a bare id or as `{ "id": ..., "username": ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ChangeSender {
    Id(String),
    Object {
        #[serde(default, deserialize_with = "d_id")]
        id: Option<String>,
    },
}

impl ChangeSender {
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Id(id) => Some(id.as_str()),
            Self::Object { id } => id.as_deref(),
        }
    }
}

/// Ids are strings on the wire, but tolerate numbers.
fn d_id<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// ── shared extraction ───────────────────────────────────────────────

/// Normalize the `messaging[]` events of one entry.
///
/// An event counts when it has a sender id and either a message or a
/// postback.  Echoes of the page's own messages are dropped.  The text is
/// the message text, else the postback payload, else empty.
pub(crate) fn messaging_events(entry: &WebhookEntry, channel: Channel) -> Vec<InboundEvent> {
    entry
        .messaging
        .iter()
        .filter_map(|event| {
            let sender_id = non_empty(event.sender.as_ref()?.id.as_deref())?;
            if event.message.is_none() && event.postback.is_none() {
                return None;
            }
            if event.message.as_ref().is_some_and(|m| m.is_echo) {
                tracing::trace!(sender = %sender_id, "skipping echo");
                return None;
            }

            let text = non_empty(event.message.as_ref().and_then(|m| m.text.as_deref()))
                .or_else(|| non_empty(event.postback.as_ref().and_then(|p| p.payload.as_deref())))
                .unwrap_or_default();

            let page_id = entry
                .id
                .clone()
                .or_else(|| event.recipient.as_ref().and_then(|r| r.id.clone()));

            Some(InboundEvent {
                channel,
                page_id,
                sender_id,
                text,
            })
        })
        .collect()
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_owned)
}
