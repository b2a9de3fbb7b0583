use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation sessions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Controls how inbound webhook events map to tenants and how long a
/// conversation survives without activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Which tenant key inbound webhook events are routed to.
    #[serde(default)]
    pub tenant_scope: TenantScope,

    /// Idle timeout in minutes.  A session untouched for longer is treated
    /// as absent and restarts at the flow's entry node.
    #[serde(default = "d_idle_minutes")]
    pub idle_minutes: u32,

    /// Per-channel idle overrides (keys: `"messenger"`, `"instagram"`).
    #[serde(default)]
    pub idle_by_channel: HashMap<String, u32>,

    /// Number of turns kept in each session's history.
    #[serde(default = "d_max_history")]
    pub max_history: usize,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            tenant_scope: TenantScope::Default,
            idle_minutes: d_idle_minutes(),
            idle_by_channel: HashMap::new(),
            max_history: d_max_history(),
        }
    }
}

/// How webhook events pick their tenant key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantScope {
    /// Every event goes to the `"default"` tenant.
    #[default]
    Default,
    /// The page / Instagram account id of the webhook entry is the tenant.
    PerPage,
}

/// Tenant key used when no page id is supplied.
pub const DEFAULT_TENANT: &str = "default";

// ── serde default helpers ───────────────────────────────────────────

fn d_idle_minutes() -> u32 {
    24 * 60
}
fn d_max_history() -> usize {
    20
}
