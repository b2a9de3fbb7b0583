use serde::Serialize;

/// Structured trace events emitted across all DMFY crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    FlowPublished {
        tenant_key: String,
        flow_id: String,
        name: String,
        version: String,
        nodes: usize,
    },
    FlowRejected {
        tenant_key: String,
        field: String,
        reason: String,
    },
    SessionResolved {
        session_key: String,
        session_id: String,
        is_new: bool,
    },
    SessionExpired {
        session_key: String,
        old_session_id: String,
        idle_minutes: u32,
    },
    SessionHealed {
        session_key: String,
        missing_node_id: String,
        entry_node_id: String,
    },
    TurnProcessed {
        session_key: String,
        from_node: String,
        to_node: String,
        matched_rule: Option<usize>,
        replies: usize,
    },
    MessageDelivered {
        channel: String,
        recipient: String,
        duration_ms: u64,
    },
    DeliveryFailed {
        channel: String,
        recipient: String,
        reason: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "dm_event");
    }
}
