//! Published flow definitions, keyed by tenant.
//!
//! Publishing compiles the definition first and then swaps it in under a
//! single write lock, so readers see either the old flow or the new one.
//! A rejected publish leaves the previous flow untouched.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use dm_domain::config::DEFAULT_TENANT;
use dm_domain::error::Result;
use dm_domain::trace::TraceEvent;

use crate::compile::CompiledFlow;
use crate::definition::FlowDefinition;

struct Published {
    flow: Arc<CompiledFlow>,
    published_at: DateTime<Utc>,
}

/// Summary row for listing published flows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSummary {
    pub key: String,
    pub id: String,
    pub name: String,
    pub version: String,
    pub nodes: usize,
    pub published_at: DateTime<Utc>,
}

/// In-memory flow store.  Single writer: the publish API.
#[derive(Default)]
pub struct FlowStore {
    flows: RwLock<HashMap<String, Published>>,
}

/// Empty tenant keys address the `"default"` tenant.
pub fn tenant_key_or_default(tenant_key: &str) -> &str {
    let trimmed = tenant_key.trim();
    if trimmed.is_empty() {
        DEFAULT_TENANT
    } else {
        trimmed
    }
}

impl FlowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and install `definition` for `tenant_key`, replacing any
    /// previous flow wholesale.  Returns the flow id.
    pub fn publish(&self, tenant_key: &str, mut definition: FlowDefinition) -> Result<String> {
        let key = tenant_key_or_default(tenant_key).to_owned();
        if definition.id.is_empty() {
            definition.id = uuid::Uuid::new_v4().to_string();
        }

        let compiled = match CompiledFlow::compile(definition) {
            Ok(c) => c,
            Err(e) => {
                TraceEvent::FlowRejected {
                    tenant_key: key,
                    field: e.field().unwrap_or_default().to_owned(),
                    reason: e.to_string(),
                }
                .emit();
                return Err(e);
            }
        };

        if !compiled.uncaptured_variables().is_empty() {
            tracing::warn!(
                tenant_key = %key,
                variables = ?compiled.uncaptured_variables(),
                "flow references variables that no node captures"
            );
        }

        let def = compiled.definition();
        let flow_id = def.id.clone();
        TraceEvent::FlowPublished {
            tenant_key: key.clone(),
            flow_id: def.id.clone(),
            name: def.name.clone(),
            version: def.version.clone(),
            nodes: def.nodes.len(),
        }
        .emit();

        self.flows.write().insert(
            key,
            Published {
                flow: Arc::new(compiled),
                published_at: Utc::now(),
            },
        );
        Ok(flow_id)
    }

    /// The tenant's current definition, if one was published.
    pub fn get(&self, tenant_key: &str) -> Option<FlowDefinition> {
        self.get_compiled(tenant_key)
            .map(|f| f.definition().clone())
    }

    /// The tenant's current compiled flow, shared with in-flight turns.
    pub fn get_compiled(&self, tenant_key: &str) -> Option<Arc<CompiledFlow>> {
        self.flows
            .read()
            .get(tenant_key_or_default(tenant_key))
            .map(|p| p.flow.clone())
    }

    /// Unpublish a tenant's flow.  Returns whether one existed.
    pub fn remove(&self, tenant_key: &str) -> bool {
        self.flows
            .write()
            .remove(tenant_key_or_default(tenant_key))
            .is_some()
    }

    /// All published flows, sorted by tenant key.
    pub fn list(&self) -> Vec<FlowSummary> {
        let mut out: Vec<FlowSummary> = self
            .flows
            .read()
            .iter()
            .map(|(key, p)| {
                let def = p.flow.definition();
                FlowSummary {
                    key: key.clone(),
                    id: def.id.clone(),
                    name: def.name.clone(),
                    version: def.version.clone(),
                    nodes: def.nodes.len(),
                    published_at: p.published_at,
                }
            })
            .collect();
        out.sort_by(|a, b| a.key.cmp(&b.key));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{MatchRule, Node};

    fn flow(name: &str, entry: &str) -> FlowDefinition {
        FlowDefinition {
            id: String::new(),
            name: name.into(),
            channel: Some("messenger".into()),
            version: "1".into(),
            nodes: vec![Node::new("start").rule(MatchRule::any()).reply("hi")],
            entry_node_id: entry.into(),
            fallback: vec![],
        }
    }

    #[test]
    fn publish_then_get() {
        let store = FlowStore::new();
        store.publish("page1", flow("A", "start")).unwrap();

        let got = store.get("page1").unwrap();
        assert_eq!(got.name, "A");
        assert!(!got.id.is_empty(), "id assigned on publish");
        assert!(store.get("page2").is_none(), "no cross-tenant visibility");
    }

    #[test]
    fn empty_key_is_default_tenant() {
        let store = FlowStore::new();
        store.publish("", flow("A", "start")).unwrap();
        assert!(store.get("default").is_some());
        assert!(store.get("  ").is_some());
    }

    #[test]
    fn republish_replaces_wholesale() {
        let store = FlowStore::new();
        store.publish("default", flow("A", "start")).unwrap();
        store.publish("default", flow("B", "start")).unwrap();
        assert_eq!(store.get("default").unwrap().name, "B");
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn invalid_publish_keeps_previous() {
        let store = FlowStore::new();
        store.publish("default", flow("A", "start")).unwrap();

        let err = store.publish("default", flow("B", "missing")).unwrap_err();
        assert_eq!(err.field(), Some("entryNodeId"));
        assert_eq!(store.get("default").unwrap().name, "A");
    }

    #[test]
    fn remove_unpublishes() {
        let store = FlowStore::new();
        store.publish("page1", flow("A", "start")).unwrap();
        assert!(store.remove("page1"));
        assert!(!store.remove("page1"));
        assert!(store.get("page1").is_none());
    }
}
