//! One inbound event through the engine and out through the dispatcher.

use std::time::Duration;

use dm_channels::{deliver_all, DeliveryReport, InboundEvent};
use dm_domain::config::{TenantScope, DEFAULT_TENANT};
use dm_domain::error::Result;

use crate::state::AppState;

/// Tenant key for an event under the configured scope.
pub fn tenant_for(scope: TenantScope, page_id: Option<&str>) -> &str {
    match (scope, page_id) {
        (TenantScope::PerPage, Some(id)) if !id.trim().is_empty() => id,
        _ => DEFAULT_TENANT,
    }
}

/// Run one event through the tenant's flow and deliver the replies.
///
/// Delivery failures are reported, not returned: the session has already
/// advanced, and a failed reply must not hold back the following ones.
pub async fn process_event(state: &AppState, event: &InboundEvent) -> Result<DeliveryReport> {
    let tenant = tenant_for(state.config.sessions.tenant_scope, event.page_id.as_deref());

    let replies = state
        .engine
        .handle(tenant, &event.sender_id, event.channel, &event.text)
        .await?;

    let texts: Vec<String> = replies.into_iter().map(|m| m.text).collect();
    let timeout = Duration::from_millis(state.config.messenger.send_timeout_ms);
    let report = deliver_all(
        state.dispatcher.as_ref(),
        event.channel,
        &event.sender_id,
        texts,
        timeout,
    )
    .await;

    tracing::debug!(
        tenant = %tenant,
        channel = %event.channel,
        sender = %event.sender_id,
        sent = report.sent,
        failed = report.failed.len(),
        "event processed"
    );
    Ok(report)
}

/// What happened to a batch of inbound events.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Events the engine handled, whether or not every reply went out.
    pub processed: usize,
    /// Events the engine could not handle at all.
    pub errored: usize,
    /// One report per processed event, in event order.
    pub reports: Vec<DeliveryReport>,
}

impl BatchOutcome {
    pub fn sent(&self) -> usize {
        self.reports.iter().map(|r| r.sent).sum()
    }

    /// Replies that were not delivered.
    pub fn undelivered(&self) -> usize {
        self.reports.iter().map(|r| r.failed.len()).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.errored == 0 && self.undelivered() == 0
    }
}

/// Process events strictly in order.  A failing event is logged and the
/// rest still run.
pub async fn process_events(state: &AppState, events: &[InboundEvent]) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    for event in events {
        match process_event(state, event).await {
            Ok(report) => {
                outcome.processed += 1;
                outcome.reports.push(report);
            }
            Err(e) => {
                outcome.errored += 1;
                tracing::error!(
                    channel = %event.channel,
                    sender = %event.sender_id,
                    error = %e,
                    "failed to process inbound event"
                );
            }
        }
    }
    outcome
}
