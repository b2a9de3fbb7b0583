//! Outbound message sinks.

use async_trait::async_trait;
use parking_lot::Mutex;

use dm_domain::error::{Error, Result};

/// Delivers one text message to one recipient.
///
/// Implementations report failures instead of swallowing them; callers
/// decide whether the remaining messages of a turn still go out.
#[async_trait]
pub trait MessageDispatcher: Send + Sync {
    /// Short name for logs (`"graph"`, `"dry-run"`, ...).
    fn name(&self) -> &str;

    async fn send(&self, recipient_id: &str, text: &str) -> Result<()>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Dry run
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Logs messages instead of sending them.  Used when no page access token
/// is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunDispatcher;

#[async_trait]
impl MessageDispatcher for DryRunDispatcher {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn send(&self, recipient_id: &str, text: &str) -> Result<()> {
        tracing::info!(recipient = %recipient_id, text = %text, "dry-run send");
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Recording
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient_id: String,
    pub text: String,
}

/// Keeps every message in memory.  Messages whose text is listed in
/// `fail_on` are rejected with [`Error::Delivery`] and not recorded.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<SentMessage>>,
    fail_on: Vec<String>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_on: texts.into_iter().map(Into::into).collect(),
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent.lock().iter().map(|m| m.text.clone()).collect()
    }
}

#[async_trait]
impl MessageDispatcher for RecordingDispatcher {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, recipient_id: &str, text: &str) -> Result<()> {
        if self.fail_on.iter().any(|t| t == text) {
            return Err(Error::Delivery {
                recipient: recipient_id.to_owned(),
                message: "rejected by recording dispatcher".into(),
            });
        }
        self.sent.lock().push(SentMessage {
            recipient_id: recipient_id.to_owned(),
            text: text.to_owned(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_keeps_order() {
        let d = RecordingDispatcher::new();
        d.send("u1", "a").await.unwrap();
        d.send("u2", "b").await.unwrap();
        assert_eq!(d.texts(), vec!["a", "b"]);
        assert_eq!(d.sent()[1].recipient_id, "u2");
    }

    #[tokio::test]
    async fn recording_rejects_configured_texts() {
        let d = RecordingDispatcher::failing_on(["bad"]);
        assert!(matches!(
            d.send("u1", "bad").await,
            Err(Error::Delivery { .. })
        ));
        assert!(d.sent().is_empty());
    }

    #[tokio::test]
    async fn dry_run_always_succeeds() {
        assert!(DryRunDispatcher.send("u1", "hi").await.is_ok());
    }
}
