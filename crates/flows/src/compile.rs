//! Validation and indexing of published flows.
//!
//! A definition only ever reaches the store as a [`CompiledFlow`]: every
//! node reference resolved, every regex compiled once.  Validation errors
//! name the offending field using the dashboard's JSON path.

use std::collections::{BTreeSet, HashMap};

use dm_domain::error::{Error, Result};

use crate::definition::{FlowDefinition, MatchRule, Node};
use crate::matcher::{normalize, Matcher};
use crate::template::referenced_variables;

/// A validated flow with its matchers compiled and nodes indexed by id.
#[derive(Debug, Clone)]
pub struct CompiledFlow {
    definition: FlowDefinition,
    index: HashMap<String, usize>,
    matchers: Vec<Vec<Matcher>>,
    uncaptured: Vec<String>,
}

/// Borrowed view of one node and its compiled rules.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    pub node: &'a Node,
    pub matchers: &'a [Matcher],
}

impl CompiledFlow {
    /// Validate `definition` and compile its match rules.
    pub fn compile(definition: FlowDefinition) -> Result<Self> {
        if definition.nodes.is_empty() {
            return Err(Error::validation("nodes", "flow must contain at least one node"));
        }

        let mut index = HashMap::with_capacity(definition.nodes.len());
        for (i, node) in definition.nodes.iter().enumerate() {
            if node.id.trim().is_empty() {
                return Err(Error::validation(format!("nodes[{i}].id"), "node id must not be empty"));
            }
            if index.insert(node.id.clone(), i).is_some() {
                return Err(Error::validation(
                    format!("nodes[{i}].id"),
                    format!("duplicate node id \"{}\"", node.id),
                ));
            }
        }

        if definition.entry_node_id.is_empty() {
            return Err(Error::validation("entryNodeId", "entry node id is required"));
        }
        if !index.contains_key(&definition.entry_node_id) {
            return Err(Error::validation(
                "entryNodeId",
                format!("node \"{}\" does not exist", definition.entry_node_id),
            ));
        }

        let mut matchers = Vec::with_capacity(definition.nodes.len());
        for (i, node) in definition.nodes.iter().enumerate() {
            if let Some(next) = &node.next_node_id {
                if !index.contains_key(next) {
                    return Err(Error::validation(
                        format!("nodes[{i}].nextNodeId"),
                        format!("node \"{next}\" does not exist"),
                    ));
                }
            }
            if let Some(var) = &node.captures {
                if var.trim().is_empty() {
                    return Err(Error::validation(
                        format!("nodes[{i}].captures"),
                        "variable name must not be empty",
                    ));
                }
            }

            let mut compiled = Vec::with_capacity(node.match_rules.len());
            for (j, rule) in node.match_rules.iter().enumerate() {
                let path = format!("nodes[{i}].matchRules[{j}]");
                if let Some(target) = &rule.target {
                    if !index.contains_key(target) {
                        return Err(Error::validation(
                            format!("{path}.target"),
                            format!("node \"{target}\" does not exist"),
                        ));
                    }
                }
                compiled.push(compile_rule(rule, &path)?);
            }
            matchers.push(compiled);
        }

        let uncaptured = uncaptured_variables(&definition);
        Ok(Self {
            definition,
            index,
            matchers,
            uncaptured,
        })
    }

    pub fn definition(&self) -> &FlowDefinition {
        &self.definition
    }

    pub fn entry_node_id(&self) -> &str {
        &self.definition.entry_node_id
    }

    /// Flow-level fallback replies.
    pub fn fallback(&self) -> &[String] {
        &self.definition.fallback
    }

    /// Variables used in some template that no node captures.  They
    /// always render empty.
    pub fn uncaptured_variables(&self) -> &[String] {
        &self.uncaptured
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.index.contains_key(node_id)
    }

    pub fn node(&self, node_id: &str) -> Option<NodeRef<'_>> {
        let i = *self.index.get(node_id)?;
        Some(NodeRef {
            node: &self.definition.nodes[i],
            matchers: &self.matchers[i],
        })
    }

    /// The entry node.  Always present after compilation.
    pub fn entry(&self) -> NodeRef<'_> {
        let i = self.index[&self.definition.entry_node_id];
        NodeRef {
            node: &self.definition.nodes[i],
            matchers: &self.matchers[i],
        }
    }
}

impl<'a> NodeRef<'a> {
    /// Index of the first rule matching `normalized`, in declared order.
    pub fn first_match(&self, normalized: &str) -> Option<usize> {
        self.matchers.iter().position(|m| m.matches(normalized))
    }
}

fn uncaptured_variables(def: &FlowDefinition) -> Vec<String> {
    let captured: BTreeSet<&str> = def
        .nodes
        .iter()
        .filter_map(|n| n.captures.as_deref())
        .collect();

    let templates = def.fallback.iter().chain(def.nodes.iter().flat_map(|n| {
        n.reply_templates
            .iter()
            .chain(n.fallback.iter().flatten())
            .chain(n.match_rules.iter().flat_map(|r| r.replies.iter().flatten()))
    }));

    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for template in templates {
        for var in referenced_variables(template) {
            if !captured.contains(var) && seen.insert(var) {
                out.push(var.to_owned());
            }
        }
    }
    out
}

/// Members must survive normalization; an empty needle matches everything.
fn check_members(values: &[String], field: &str) -> Result<()> {
    if values.is_empty() {
        return Err(Error::validation(field, "must list at least one value"));
    }
    match values.iter().position(|v| normalize(v).is_empty()) {
        Some(k) => Err(Error::validation(
            format!("{field}[{k}]"),
            "value must not be blank",
        )),
        None => Ok(()),
    }
}

fn compile_rule(rule: &MatchRule, path: &str) -> Result<Matcher> {
    let set = [
        rule.exact.is_some(),
        rule.contains.is_some(),
        rule.regex.is_some(),
        rule.any.is_some(),
    ]
    .iter()
    .filter(|b| **b)
    .count();
    if set != 1 {
        return Err(Error::validation(
            path,
            "exactly one of exact, contains, regex or any must be set",
        ));
    }

    if let Some(values) = &rule.exact {
        check_members(values, &format!("{path}.exact"))?;
        return Ok(Matcher::exact(values));
    }
    if let Some(values) = &rule.contains {
        check_members(values, &format!("{path}.contains"))?;
        return Ok(Matcher::contains(values));
    }
    if let Some(pattern) = &rule.regex {
        return Matcher::regex(pattern)
            .map_err(|e| Error::validation(format!("{path}.regex"), e.to_string()));
    }
    match rule.any {
        Some(true) => Ok(Matcher::Any),
        _ => Err(Error::validation(format!("{path}.any"), "must be true when present")),
    }
}
