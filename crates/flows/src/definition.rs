//! Wire shape of a published flow.
//!
//! Field names follow the dashboard's JSON (`camelCase`).  Definitions are
//! checked and indexed by [`crate::compile::CompiledFlow`] before they are
//! ever served.

use serde::{Deserialize, Deserializer, Serialize};

/// A complete conversation graph for one tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowDefinition {
    /// Assigned on publish when left empty.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Channel the dashboard built the flow for (informational).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub version: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub entry_node_id: String,
    /// Global fallback replies for nodes without their own fallback.
    #[serde(default)]
    pub fallback: Vec<String>,
}

/// One conversational turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    /// Evaluated in order; the first match wins.
    #[serde(default)]
    pub match_rules: Vec<MatchRule>,
    #[serde(default)]
    pub reply_templates: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_node_id: Option<String>,
    /// Session variable that receives the raw inbound text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captures: Option<String>,
    /// Replies when no rule matches.  Falls back to the flow's `fallback`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Vec<String>>,
}

/// A predicate over normalized input plus what happens when it wins.
///
/// Exactly one of `exact`, `contains`, `regex` or `any` must be set:
///
/// ```json
/// { "contains": ["1", "mentoria"], "target": "ticket", "replies": ["Top!"] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// `true` matches every input, including empty text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any: Option<bool>,
    /// Transition override; defaults to the node's `nextNodeId`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Replace the node's `replyTemplates` when this rule wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<String>>,
}

impl MatchRule {
    pub fn exact<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exact: Some(values.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn contains<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            contains: Some(values.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Self {
            regex: Some(pattern.into()),
            ..Default::default()
        }
    }

    pub fn any() -> Self {
        Self {
            any: Some(true),
            ..Default::default()
        }
    }

    /// Transition to `node_id` when this rule wins.
    pub fn to(mut self, node_id: impl Into<String>) -> Self {
        self.target = Some(node_id.into());
        self
    }

    /// Reply with `replies` instead of the node's templates.
    pub fn replying<I, S>(mut self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.replies = Some(replies.into_iter().map(Into::into).collect());
        self
    }
}

impl Node {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            match_rules: Vec::new(),
            reply_templates: Vec::new(),
            next_node_id: None,
            captures: None,
            fallback: None,
        }
    }

    pub fn rule(mut self, rule: MatchRule) -> Self {
        self.match_rules.push(rule);
        self
    }

    pub fn reply(mut self, template: impl Into<String>) -> Self {
        self.reply_templates.push(template.into());
        self
    }

    pub fn next(mut self, node_id: impl Into<String>) -> Self {
        self.next_node_id = Some(node_id.into());
        self
    }

    pub fn capture(mut self, variable: impl Into<String>) -> Self {
        self.captures = Some(variable.into());
        self
    }

    pub fn fallback<I, S>(mut self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fallback = Some(replies.into_iter().map(Into::into).collect());
        self
    }
}

/// Dashboards send `version` as either `"3"` or `3`.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}
