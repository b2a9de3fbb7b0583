//! Webhook payload normalization and reply delivery, end to end within
//! the crate.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use dm_channels::{
    deliver_all, parse_webhook, MessageDispatcher, RecordingDispatcher, WebhookObject,
};
use dm_domain::{Channel, Error, Result};

fn parse(value: serde_json::Value) -> dm_channels::ParsedWebhook {
    parse_webhook(value.to_string().as_bytes()).unwrap()
}

#[test]
fn messenger_text_message() {
    let parsed = parse(json!({
        "object": "page",
        "entry": [{
            "id": "PAGE_1",
            "time": 1700000000,
            "messaging": [{
                "sender": { "id": "PSID_1" },
                "recipient": { "id": "PAGE_1" },
                "timestamp": 1700000000,
                "message": { "mid": "m1", "text": "Oi" }
            }]
        }]
    }));

    assert_eq!(parsed.object, WebhookObject::Page);
    assert_eq!(parsed.events.len(), 1);
    let e = &parsed.events[0];
    assert_eq!(e.channel, Channel::Messenger);
    assert_eq!(e.sender_id, "PSID_1");
    assert_eq!(e.page_id.as_deref(), Some("PAGE_1"));
    assert_eq!(e.text, "Oi");
}

#[test]
fn messenger_postback_uses_payload() {
    let parsed = parse(json!({
        "object": "page",
        "entry": [{ "id": "P", "messaging": [{
            "sender": { "id": "U" },
            "postback": { "title": "Começar", "payload": "start" }
        }]}]
    }));
    assert_eq!(parsed.events[0].text, "start");
}

#[test]
fn messenger_attachment_only_has_empty_text() {
    let parsed = parse(json!({
        "object": "page",
        "entry": [{ "id": "P", "messaging": [{
            "sender": { "id": "U" },
            "message": { "mid": "m", "attachments": [{ "type": "image" }] }
        }]}]
    }));
    assert_eq!(parsed.events.len(), 1);
    assert_eq!(parsed.events[0].text, "");
}

#[test]
fn messenger_skips_echoes_reads_and_senderless_events() {
    let parsed = parse(json!({
        "object": "page",
        "entry": [{ "id": "P", "messaging": [
            { "sender": { "id": "P" }, "message": { "text": "bot reply", "is_echo": true } },
            { "sender": { "id": "U" }, "read": { "watermark": 1 } },
            { "message": { "text": "no sender" } },
            { "sender": { "id": "U" }, "message": { "text": "real" } }
        ]}]
    }));
    assert_eq!(parsed.events.len(), 1);
    assert_eq!(parsed.events[0].text, "real");
}

#[test]
fn messenger_events_keep_order_across_entries() {
    let parsed = parse(json!({
        "object": "page",
        "entry": [
            { "id": "P", "messaging": [
                { "sender": { "id": "A" }, "message": { "text": "1" } },
                { "sender": { "id": "B" }, "message": { "text": "2" } }
            ]},
            { "id": "P", "messaging": [
                { "sender": { "id": "A" }, "message": { "text": "3" } }
            ]}
        ]
    }));
    let texts: Vec<_> = parsed.events.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["1", "2", "3"]);
}

#[test]
fn instagram_changes_read_first_message_only() {
    let parsed = parse(json!({
        "object": "instagram",
        "entry": [{
            "id": "IG_ACCOUNT",
            "changes": [{
                "field": "messages",
                "value": { "messages": [
                    { "from": "IGSID_1", "text": "quero mentoria" },
                    { "from": "IGSID_2", "text": "ignored" }
                ]}
            }]
        }]
    }));

    assert_eq!(parsed.object, WebhookObject::Instagram);
    assert_eq!(parsed.events.len(), 1);
    let e = &parsed.events[0];
    assert_eq!(e.channel, Channel::Instagram);
    assert_eq!(e.sender_id, "IGSID_1");
    assert_eq!(e.text, "quero mentoria");
    assert_eq!(e.page_id.as_deref(), Some("IG_ACCOUNT"));
}

#[test]
fn instagram_from_object_and_messaging_events() {
    let parsed = parse(json!({
        "object": "instagram",
        "entry": [{
            "id": "IG",
            "changes": [
                { "field": "messages", "value": { "messages": [
                    { "from": { "id": "U1", "username": "ana" }, "text": "oi" }
                ]}},
                { "field": "comments", "value": { "text": "not a dm" } }
            ],
            "messaging": [
                { "sender": { "id": "U2" }, "message": { "text": "olá" } }
            ]
        }]
    }));

    let pairs: Vec<_> = parsed
        .events
        .iter()
        .map(|e| (e.sender_id.as_str(), e.text.as_str(), e.channel))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("U1", "oi", Channel::Instagram),
            ("U2", "olá", Channel::Instagram)
        ]
    );
}

#[test]
fn instagram_message_without_from_is_skipped() {
    let parsed = parse(json!({
        "object": "instagram",
        "entry": [{ "changes": [{ "value": { "messages": [{ "text": "orphan" }] } }] }]
    }));
    assert!(parsed.events.is_empty());
    assert!(parsed.object.is_supported());
}

// ── delivery ────────────────────────────────────────────────────────

struct SlowDispatcher;

#[async_trait]
impl MessageDispatcher for SlowDispatcher {
    fn name(&self) -> &str {
        "slow"
    }

    async fn send(&self, _recipient_id: &str, text: &str) -> Result<()> {
        if text == "slow" {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        Ok(())
    }
}

#[tokio::test]
async fn delivery_preserves_order() {
    let d = RecordingDispatcher::new();
    let report = deliver_all(
        &d,
        Channel::Messenger,
        "U",
        ["first", "second", "third"],
        Duration::from_secs(1),
    )
    .await;
    assert!(report.is_complete());
    assert_eq!(report.sent, 3);
    assert_eq!(d.texts(), vec!["first", "second", "third"]);
}

#[tokio::test]
async fn delivery_continues_after_failure() {
    let d = RecordingDispatcher::failing_on(["second"]);
    let report = deliver_all(
        &d,
        Channel::Instagram,
        "U",
        vec!["first".to_string(), "second".into(), "third".into()],
        Duration::from_secs(1),
    )
    .await;

    assert_eq!(report.sent, 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].index, 1);
    assert_eq!(d.texts(), vec!["first", "third"]);

    match report.into_result() {
        Err(Error::Delivery { recipient, .. }) => assert_eq!(recipient, "U"),
        other => panic!("expected delivery error, got {other:?}"),
    }
}

#[tokio::test]
async fn delivery_times_out_slow_sends() {
    let report = deliver_all(
        &SlowDispatcher,
        Channel::Messenger,
        "U",
        ["fast", "slow", "fast"],
        Duration::from_millis(100),
    )
    .await;
    assert_eq!(report.sent, 2);
    assert_eq!(report.failed[0].index, 1);
    assert!(report.failed[0].reason.contains("timeout"));
}
