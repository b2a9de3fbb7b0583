//! The conversation state machine.
//!
//! States are node ids of the tenant's flow; transitions are driven by the
//! first matching rule and default to the node's `nextNodeId`.  Every call
//! to [`FlowEngine::handle`] runs under the sender's session lock, so two
//! messages from the same sender are processed strictly one after the other.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use dm_domain::error::Result;
use dm_domain::trace::TraceEvent;
use dm_domain::Channel;
use dm_sessions::{compute_session_key, Session, SessionLockMap, SessionStore, TurnRecord};

use crate::builtin::builtin_flow;
use crate::compile::CompiledFlow;
use crate::matcher::normalize;
use crate::store::{tenant_key_or_default, FlowStore};
use crate::template::render;

/// One outbound text message, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub text: String,
}

/// What a single turn did to the session.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub messages: Vec<OutboundMessage>,
    pub from_node: String,
    pub to_node: String,
    /// Index of the winning rule within the evaluated node.
    pub matched_rule: Option<usize>,
    /// The session pointed at a node the flow no longer has.
    pub healed: bool,
}

/// Advance `session` by one inbound message against `flow`.
///
/// Pure with respect to its inputs: the same flow, session and text always
/// produce the same outcome and the same resulting session.
pub fn step(
    flow: &CompiledFlow,
    session: &mut Session,
    raw_text: &str,
    now: DateTime<Utc>,
) -> TurnOutcome {
    let normalized = normalize(raw_text);

    let mut healed = false;
    let current = match flow.node(&session.current_node_id) {
        Some(node) => node,
        None => {
            tracing::warn!(
                session_key = %session.session_key,
                missing_node = %session.current_node_id,
                entry_node = %flow.entry_node_id(),
                "session references a node missing from the flow, resetting to entry"
            );
            TraceEvent::SessionHealed {
                session_key: session.session_key.clone(),
                missing_node_id: session.current_node_id.clone(),
                entry_node_id: flow.entry_node_id().to_owned(),
            }
            .emit();
            session.current_node_id = flow.entry_node_id().to_owned();
            healed = true;
            flow.entry()
        }
    };
    let node = current.node;

    let matched_rule = current.first_match(&normalized);
    let (next_node, templates): (&str, &[String]) = match matched_rule {
        Some(i) => {
            let rule = &node.match_rules[i];
            let next = rule
                .target
                .as_deref()
                .or(node.next_node_id.as_deref())
                .unwrap_or(node.id.as_str());
            let replies = rule
                .replies
                .as_deref()
                .unwrap_or(node.reply_templates.as_slice());
            (next, replies)
        }
        None => {
            let replies = node.fallback.as_deref().unwrap_or(flow.fallback());
            (node.id.as_str(), replies)
        }
    };

    if let Some(var) = &node.captures {
        session.variables.insert(var.clone(), raw_text.to_owned());
    }

    let messages: Vec<OutboundMessage> = templates
        .iter()
        .map(|t| OutboundMessage {
            text: render(t, &session.variables),
        })
        .collect();

    let from_node = node.id.clone();
    let to_node = next_node.to_owned();

    session.history.push(TurnRecord {
        at: now,
        input: raw_text.to_owned(),
        from_node: from_node.clone(),
        to_node: to_node.clone(),
        matched_rule,
        replies: messages.iter().map(|m| m.text.clone()).collect(),
    });
    session.current_node_id = to_node.clone();
    session.last_activity_at = now;

    TurnOutcome {
        messages,
        from_node,
        to_node,
        matched_rule,
        healed,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Engine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Executes each tenant's flow against inbound messages.
///
/// The engine is the only writer of sessions; the flow store is only read.
pub struct FlowEngine {
    flows: Arc<FlowStore>,
    sessions: Arc<SessionStore>,
    locks: SessionLockMap,
    builtin: Arc<CompiledFlow>,
}

impl FlowEngine {
    pub fn new(flows: Arc<FlowStore>, sessions: Arc<SessionStore>) -> Self {
        Self {
            flows,
            sessions,
            locks: SessionLockMap::new(),
            builtin: Arc::new(builtin_flow()),
        }
    }

    pub fn flows(&self) -> &Arc<FlowStore> {
        &self.flows
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn locks(&self) -> &SessionLockMap {
        &self.locks
    }

    /// The tenant's published flow, or the built-in default.
    pub fn resolve_flow(&self, tenant_key: &str) -> Arc<CompiledFlow> {
        self.flows
            .get_compiled(tenant_key)
            .unwrap_or_else(|| self.builtin.clone())
    }

    /// Process one inbound message and return the replies to deliver.
    pub async fn handle(
        &self,
        tenant_key: &str,
        sender_id: &str,
        channel: Channel,
        raw_text: &str,
    ) -> Result<Vec<OutboundMessage>> {
        self.handle_at(tenant_key, sender_id, channel, raw_text, Utc::now())
            .await
            .map(|outcome| outcome.messages)
    }

    /// [`handle`](Self::handle) with an explicit clock, returning the full
    /// turn outcome.
    pub async fn handle_at(
        &self,
        tenant_key: &str,
        sender_id: &str,
        channel: Channel,
        raw_text: &str,
        now: DateTime<Utc>,
    ) -> Result<TurnOutcome> {
        let tenant_key = tenant_key_or_default(tenant_key);
        let flow = self.resolve_flow(tenant_key);

        let session_key = compute_session_key(tenant_key, channel, sender_id);
        let _permit = self.locks.acquire(&session_key).await?;

        let (mut session, is_new) = self.sessions.get_or_create(
            tenant_key,
            sender_id,
            channel,
            flow.entry_node_id(),
            now,
        );
        if is_new {
            tracing::info!(
                session_key = %session_key,
                session_id = %session.session_id,
                flow_id = %flow.definition().id,
                "new conversation session"
            );
        }

        let outcome = step(&flow, &mut session, raw_text, now);
        self.sessions.save(session);

        TraceEvent::TurnProcessed {
            session_key,
            from_node: outcome.from_node.clone(),
            to_node: outcome.to_node.clone(),
            matched_rule: outcome.matched_rule,
            replies: outcome.messages.len(),
        }
        .emit();

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{FlowDefinition, MatchRule, Node};

    fn compiled(nodes: Vec<Node>, entry: &str) -> CompiledFlow {
        CompiledFlow::compile(FlowDefinition {
            id: "t".into(),
            name: "t".into(),
            channel: None,
            version: "1".into(),
            nodes,
            entry_node_id: entry.into(),
            fallback: vec!["global fallback".into()],
        })
        .unwrap()
    }

    fn session(node: &str) -> Session {
        Session::new("default", "u1", Channel::Messenger, node, Utc::now())
    }

    fn texts(outcome: &TurnOutcome) -> Vec<&str> {
        outcome.messages.iter().map(|m| m.text.as_str()).collect()
    }

    #[test]
    fn matched_rule_uses_node_next() {
        let flow = compiled(
            vec![
                Node::new("a").rule(MatchRule::exact(["go"])).reply("going").next("b"),
                Node::new("b"),
            ],
            "a",
        );
        let mut s = session("a");
        let out = step(&flow, &mut s, "GO", Utc::now());
        assert_eq!(texts(&out), vec!["going"]);
        assert_eq!(s.current_node_id, "b");
        assert_eq!(out.matched_rule, Some(0));
    }

    #[test]
    fn rule_target_overrides_next() {
        let flow = compiled(
            vec![
                Node::new("a")
                    .rule(MatchRule::exact(["x"]).to("c").replying(["to c"]))
                    .reply("default")
                    .next("b"),
                Node::new("b"),
                Node::new("c"),
            ],
            "a",
        );
        let mut s = session("a");
        let out = step(&flow, &mut s, "x", Utc::now());
        assert_eq!(texts(&out), vec!["to c"]);
        assert_eq!(s.current_node_id, "c");
    }

    #[test]
    fn no_match_stays_and_uses_node_fallback_first() {
        let flow = compiled(
            vec![
                Node::new("a")
                    .rule(MatchRule::exact(["x"]))
                    .fallback(["node fallback"])
                    .next("b"),
                Node::new("b").rule(MatchRule::exact(["y"])),
            ],
            "a",
        );
        let mut s = session("a");
        let out = step(&flow, &mut s, "nope", Utc::now());
        assert_eq!(texts(&out), vec!["node fallback"]);
        assert_eq!(s.current_node_id, "a");
        assert_eq!(out.matched_rule, None);

        let mut s = session("b");
        let out = step(&flow, &mut s, "nope", Utc::now());
        assert_eq!(texts(&out), vec!["global fallback"]);
        assert_eq!(s.current_node_id, "b");
    }

    #[test]
    fn matched_node_without_transition_parks() {
        let flow = compiled(vec![Node::new("a").rule(MatchRule::any()).reply("again")], "a");
        let mut s = session("a");
        step(&flow, &mut s, "1", Utc::now());
        step(&flow, &mut s, "2", Utc::now());
        assert_eq!(s.current_node_id, "a");
        assert_eq!(s.history.len(), 2);
    }

    #[test]
    fn capture_stores_raw_text_before_rendering() {
        let flow = compiled(
            vec![
                Node::new("ask")
                    .rule(MatchRule::any())
                    .capture("nicho")
                    .reply("Nicho: {nicho}")
                    .next("done"),
                Node::new("done"),
            ],
            "ask",
        );
        let mut s = session("ask");
        let out = step(&flow, &mut s, "  Saúde & Beleza ", Utc::now());
        assert_eq!(s.variables["nicho"], "  Saúde & Beleza ");
        assert_eq!(texts(&out), vec!["Nicho:   Saúde & Beleza "]);
    }

    #[test]
    fn stale_node_heals_to_entry_and_evaluates_it() {
        let flow = compiled(
            vec![
                Node::new("start").rule(MatchRule::exact(["oi"])).reply("menu").next("menu"),
                Node::new("menu"),
            ],
            "start",
        );
        let mut s = session("removed-node");
        let out = step(&flow, &mut s, "oi", Utc::now());
        assert!(out.healed);
        assert_eq!(out.from_node, "start");
        assert_eq!(texts(&out), vec!["menu"]);
        assert_eq!(s.current_node_id, "menu");
    }

    #[test]
    fn history_records_turn() {
        let flow = compiled(vec![Node::new("a").rule(MatchRule::any()).reply("ok")], "a");
        let mut s = session("a");
        let now = Utc::now();
        step(&flow, &mut s, "Olá", now);
        let rec = &s.history[0];
        assert_eq!(rec.input, "Olá");
        assert_eq!(rec.replies, vec!["ok".to_string()]);
        assert_eq!(rec.matched_rule, Some(0));
        assert_eq!(s.last_activity_at, now);
    }
}
