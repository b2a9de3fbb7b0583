//! `dmfy run`: drive a flow from the terminal.
//!
//! Uses the same engine and session rules as the server, with in-memory
//! stores and no dispatcher: replies are printed.

use std::path::PathBuf;
use std::sync::Arc;

use dm_domain::config::{Config, DEFAULT_TENANT};
use dm_domain::Channel;
use dm_flows::{FlowEngine, FlowStore};
use dm_sessions::SessionStore;

use super::flow::load_flow_file;

pub struct RunArgs {
    pub messages: Vec<String>,
    pub flow: Option<PathBuf>,
    pub sender: String,
    pub channel: Channel,
    pub json: bool,
}

pub async fn run(config: Arc<Config>, args: RunArgs) -> anyhow::Result<()> {
    let flows = Arc::new(FlowStore::new());
    let sessions = Arc::new(SessionStore::new(&config.sessions));
    let engine = FlowEngine::new(flows.clone(), sessions);

    if let Some(path) = &args.flow {
        let definition = load_flow_file(path)?;
        flows
            .publish(DEFAULT_TENANT, definition)
            .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;
    }

    for message in &args.messages {
        let outcome = engine
            .handle_at(
                DEFAULT_TENANT,
                &args.sender,
                args.channel,
                message,
                chrono::Utc::now(),
            )
            .await?;

        if args.json {
            let line = serde_json::json!({
                "input": message,
                "from": outcome.from_node,
                "to": outcome.to_node,
                "matchedRule": outcome.matched_rule,
                "replies": outcome.messages,
            });
            println!("{line}");
        } else {
            println!("> {message}");
            for reply in &outcome.messages {
                println!("{}", reply.text);
            }
            if outcome.messages.is_empty() {
                eprintln!("\x1b[2m(no reply)\x1b[0m");
            }
        }
    }

    Ok(())
}
