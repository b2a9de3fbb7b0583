//! Declarative conversation flows for DMFY.
//!
//! A [`FlowDefinition`] is a graph of nodes whose match rules are data, not
//! code.  Dashboards publish definitions into the [`FlowStore`]; the
//! [`FlowEngine`] interprets the tenant's current definition against each
//! inbound message and advances the sender's session.

pub mod builtin;
pub mod compile;
pub mod definition;
pub mod engine;
pub mod matcher;
pub mod store;
pub mod template;

pub use compile::CompiledFlow;
pub use definition::{FlowDefinition, MatchRule, Node};
pub use engine::{FlowEngine, OutboundMessage, TurnOutcome};
pub use store::FlowStore;
