//! Session expiry: idle timeout with per-channel overrides.
//!
//! Expiry is evaluated whenever a session is looked up for an inbound
//! message.  An expired session is treated as absent and recreated at the
//! flow's entry node.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use dm_domain::config::SessionsConfig;
use dm_domain::Channel;

use crate::store::Session;

/// Reason a session was discarded, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpiryReason {
    IdleTimeout { idle_minutes: u32 },
}

impl std::fmt::Display for ExpiryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IdleTimeout { idle_minutes } => write!(f, "idle timeout ({idle_minutes}m)"),
        }
    }
}

/// Evaluates whether a session has outlived its idle window.
#[derive(Debug, Clone)]
pub struct LifecycleManager {
    idle_minutes: u32,
    idle_by_channel: HashMap<String, u32>,
}

impl LifecycleManager {
    pub fn new(config: &SessionsConfig) -> Self {
        Self {
            idle_minutes: config.idle_minutes,
            idle_by_channel: config.idle_by_channel.clone(),
        }
    }

    /// Effective idle timeout for a channel.  Per-channel overrides take
    /// precedence over the global value.
    pub fn idle_minutes_for(&self, channel: Channel) -> u32 {
        self.idle_by_channel
            .get(channel.as_str())
            .copied()
            .unwrap_or(self.idle_minutes)
    }

    /// Returns `Some(reason)` when `now - last_activity_at` exceeds the
    /// channel's idle timeout.
    pub fn should_expire(&self, session: &Session, now: DateTime<Utc>) -> Option<ExpiryReason> {
        let idle = self.idle_minutes_for(session.channel);
        let elapsed = now.signed_duration_since(session.last_activity_at);
        if elapsed > chrono::Duration::minutes(i64::from(idle)) {
            Some(ExpiryReason::IdleTimeout { idle_minutes: idle })
        } else {
            None
        }
    }
}
