//! Deliver a turn's replies in order.

use std::time::{Duration, Instant};

use dm_domain::error::{Error, Result};
use dm_domain::trace::TraceEvent;
use dm_domain::Channel;

use crate::dispatch::MessageDispatcher;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    /// Position of the message within the turn's replies.
    pub index: usize,
    pub reason: String,
}

/// Outcome of delivering one turn's replies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub recipient: String,
    pub sent: usize,
    pub failed: Vec<DeliveryFailure>,
}

impl DeliveryReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// The first failure as an [`Error::Delivery`].
    pub fn into_result(self) -> Result<usize> {
        match self.failed.into_iter().next() {
            None => Ok(self.sent),
            Some(f) => Err(Error::Delivery {
                recipient: self.recipient,
                message: format!("message {}: {}", f.index, f.reason),
            }),
        }
    }
}

/// Send `texts` to `recipient_id` one after the other.
///
/// Each send is bounded by `timeout`.  A failed or timed out message is
/// recorded and the rest are still attempted, in order.
pub async fn deliver_all<I, S>(
    dispatcher: &dyn MessageDispatcher,
    channel: Channel,
    recipient_id: &str,
    texts: I,
    timeout: Duration,
) -> DeliveryReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut report = DeliveryReport {
        recipient: recipient_id.to_owned(),
        ..Default::default()
    };

    for (index, text) in texts.into_iter().enumerate() {
        let start = Instant::now();
        let result = match tokio::time::timeout(timeout, dispatcher.send(recipient_id, text.as_ref()))
            .await
        {
            Ok(r) => r,
            Err(_) => Err(Error::Timeout(format!(
                "send exceeded {}ms",
                timeout.as_millis()
            ))),
        };

        match result {
            Ok(()) => {
                report.sent += 1;
                TraceEvent::MessageDelivered {
                    channel: channel.to_string(),
                    recipient: recipient_id.to_owned(),
                    duration_ms: start.elapsed().as_millis() as u64,
                }
                .emit();
            }
            Err(e) => {
                tracing::warn!(
                    dispatcher = dispatcher.name(),
                    channel = %channel,
                    recipient = %recipient_id,
                    index,
                    error = %e,
                    "message delivery failed"
                );
                TraceEvent::DeliveryFailed {
                    channel: channel.to_string(),
                    recipient: recipient_id.to_owned(),
                    reason: e.to_string(),
                }
                .emit();
                report.failed.push(DeliveryFailure {
                    index,
                    reason: e.to_string(),
                });
            }
        }
    }

    report
}
