//! In-memory conversation session store.
//!
//! Each session key maps to a [`Session`] tracking where the sender is in
//! the flow graph, the variables captured so far and a bounded turn
//! history.  State lives for the lifetime of the process only.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use dm_domain::config::SessionsConfig;
use dm_domain::trace::TraceEvent;
use dm_domain::Channel;

use crate::lifecycle::{ExpiryReason, LifecycleManager};
use crate::session_key::{compute_session_key, effective_tenant};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A single conversation tracked by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_key: String,
    /// Minted on creation; changes when an expired session is recreated.
    pub session_id: String,
    pub tenant_key: String,
    pub sender_id: String,
    pub channel: Channel,
    pub current_node_id: String,
    /// Values captured from user input, keyed by variable name.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    /// Most recent turns, oldest first.
    #[serde(default)]
    pub history: Vec<TurnRecord>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl Session {
    /// A fresh session parked at `entry_node_id`.
    pub fn new(
        tenant_key: &str,
        sender_id: &str,
        channel: Channel,
        entry_node_id: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_key: compute_session_key(tenant_key, channel, sender_id),
            session_id: uuid::Uuid::new_v4().to_string(),
            tenant_key: tenant_key.to_owned(),
            sender_id: sender_id.to_owned(),
            channel,
            current_node_id: entry_node_id.to_owned(),
            variables: BTreeMap::new(),
            history: Vec::new(),
            created_at: now,
            last_activity_at: now,
        }
    }
}

/// One processed inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRecord {
    pub at: DateTime<Utc>,
    /// Raw inbound text as received.
    pub input: String,
    pub from_node: String,
    pub to_node: String,
    /// Index of the winning match rule; `None` when the fallback answered.
    pub matched_rule: Option<usize>,
    pub replies: Vec<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Process-wide session store keyed by session key.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    lifecycle: LifecycleManager,
    max_history: usize,
}

impl SessionStore {
    pub fn new(config: &SessionsConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            lifecycle: LifecycleManager::new(config),
            max_history: config.max_history,
        }
    }

    /// Look up a session by its key, regardless of expiry.
    pub fn get(&self, session_key: &str) -> Option<Session> {
        self.sessions.read().get(session_key).cloned()
    }

    /// Resolve the live session for a sender or create one at
    /// `entry_node_id`.  An expired session is discarded first.
    /// Returns `(session, is_new)`.
    pub fn get_or_create(
        &self,
        tenant_key: &str,
        sender_id: &str,
        channel: Channel,
        entry_node_id: &str,
        now: DateTime<Utc>,
    ) -> (Session, bool) {
        let session_key = compute_session_key(tenant_key, channel, sender_id);
        let mut sessions = self.sessions.write();

        if let Some(existing) = sessions.get(&session_key) {
            match self.lifecycle.should_expire(existing, now) {
                None => return (existing.clone(), false),
                Some(ExpiryReason::IdleTimeout { idle_minutes }) => {
                    TraceEvent::SessionExpired {
                        session_key: session_key.clone(),
                        old_session_id: existing.session_id.clone(),
                        idle_minutes,
                    }
                    .emit();
                }
            }
        }

        let session = Session::new(tenant_key, sender_id, channel, entry_node_id, now);
        sessions.insert(session_key.clone(), session.clone());

        TraceEvent::SessionResolved {
            session_key,
            session_id: session.session_id.clone(),
            is_new: true,
        }
        .emit();

        (session, true)
    }

    /// Persist a session, trimming its history to the configured bound.
    pub fn save(&self, mut session: Session) {
        if session.history.len() > self.max_history {
            let excess = session.history.len() - self.max_history;
            session.history.drain(..excess);
        }
        self.sessions
            .write()
            .insert(session.session_key.clone(), session);
    }

    /// Sessions belonging to a tenant, most recently active first.
    pub fn list(&self, tenant_key: &str) -> Vec<Session> {
        let tenant = effective_tenant(tenant_key);
        let mut out: Vec<Session> = self
            .sessions
            .read()
            .values()
            .filter(|s| effective_tenant(&s.tenant_key) == tenant)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        out
    }

    /// Forget a session entirely.
    pub fn remove(&self, session_key: &str) -> Option<Session> {
        self.sessions.write().remove(session_key)
    }

    /// Drop every expired session.  Returns how many were removed.
    pub fn prune_expired(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| self.lifecycle.should_expire(s, now).is_none());
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(idle_minutes: u32, max_history: usize) -> SessionStore {
        SessionStore::new(&SessionsConfig {
            idle_minutes,
            max_history,
            ..Default::default()
        })
    }

    fn turn(n: usize) -> TurnRecord {
        TurnRecord {
            at: Utc::now(),
            input: format!("msg {n}"),
            from_node: "a".into(),
            to_node: "a".into(),
            matched_rule: None,
            replies: vec![],
        }
    }

    #[test]
    fn creates_at_entry_node_once() {
        let store = store(60, 20);
        let now = Utc::now();

        let (s1, new1) = store.get_or_create("default", "u1", Channel::Messenger, "start", now);
        assert!(new1);
        assert_eq!(s1.current_node_id, "start");

        let mut moved = s1.clone();
        moved.current_node_id = "menu".into();
        store.save(moved);

        let (s2, new2) = store.get_or_create("default", "u1", Channel::Messenger, "start", now);
        assert!(!new2);
        assert_eq!(s2.current_node_id, "menu");
        assert_eq!(s2.session_id, s1.session_id);
    }

    #[test]
    fn expired_session_is_recreated() {
        let store = store(30, 20);
        let then = Utc::now() - chrono::Duration::minutes(45);
        let (mut s1, _) = store.get_or_create("default", "u1", Channel::Instagram, "start", then);
        s1.current_node_id = "ticket".into();
        s1.variables.insert("ticket".into(), "997".into());
        store.save(s1.clone());

        let (s2, is_new) =
            store.get_or_create("default", "u1", Channel::Instagram, "start", Utc::now());
        assert!(is_new);
        assert_eq!(s2.current_node_id, "start");
        assert!(s2.variables.is_empty());
        assert_ne!(s2.session_id, s1.session_id);
    }

    #[test]
    fn history_is_bounded() {
        let store = store(60, 3);
        let (mut s, _) = store.get_or_create("default", "u1", Channel::Messenger, "a", Utc::now());
        s.history = (0..5).map(turn).collect();
        let key = s.session_key.clone();
        store.save(s);

        let saved = store.get(&key).unwrap();
        assert_eq!(saved.history.len(), 3);
        assert_eq!(saved.history[0].input, "msg 2");
    }

    #[test]
    fn list_is_scoped_to_tenant() {
        let store = store(60, 20);
        let now = Utc::now();
        store.get_or_create("page1", "u1", Channel::Messenger, "a", now);
        store.get_or_create("page1", "u2", Channel::Instagram, "a", now);
        store.get_or_create("page2", "u1", Channel::Messenger, "a", now);

        assert_eq!(store.list("page1").len(), 2);
        assert_eq!(store.list("page2").len(), 1);
        assert!(store.list("page3").is_empty());
    }

    #[test]
    fn list_does_not_match_tenant_prefixes() {
        let store = store(60, 20);
        let now = Utc::now();
        store.get_or_create("a:b", "u1", Channel::Messenger, "x", now);
        store.get_or_create("ab", "u1", Channel::Messenger, "x", now);

        assert!(store.list("a").is_empty());
        assert_eq!(store.list("a:b").len(), 1);
        assert_eq!(store.list("a:b")[0].tenant_key, "a:b");
    }

    #[test]
    fn colliding_looking_triples_get_separate_sessions() {
        let store = store(60, 20);
        let now = Utc::now();
        let (s1, new1) =
            store.get_or_create("t", "x:messenger:dm:y", Channel::Messenger, "a", now);
        let (s2, new2) =
            store.get_or_create("t:messenger:dm:x", "y", Channel::Messenger, "a", now);

        assert!(new1 && new2);
        assert_ne!(s1.session_id, s2.session_id);
        assert_eq!(s2.tenant_key, "t:messenger:dm:x");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn empty_tenant_lists_as_default() {
        let store = store(60, 20);
        store.get_or_create("", "u1", Channel::Messenger, "a", Utc::now());
        assert_eq!(store.list("default").len(), 1);
    }

    #[test]
    fn prune_drops_only_expired() {
        let store = store(10, 20);
        let now = Utc::now();
        store.get_or_create("default", "old", Channel::Messenger, "a", now - chrono::Duration::hours(1));
        store.get_or_create("default", "fresh", Channel::Messenger, "a", now);

        assert_eq!(store.prune_expired(now), 1);
        assert_eq!(store.len(), 1);
    }
}
