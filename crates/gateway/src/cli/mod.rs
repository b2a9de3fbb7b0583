pub mod config;
pub mod flow;
pub mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use dm_domain::Channel;

/// DMFY: a Messenger / Instagram webhook driven by declarative flows.
#[derive(Debug, Parser)]
#[command(name = "dmfy", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the webhook server (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Flow file utilities.
    #[command(subcommand)]
    Flow(FlowCommand),
    /// Run messages through a flow offline and print the replies.
    Run {
        /// Messages to send, in order, from the same sender.
        #[arg(required = true)]
        messages: Vec<String>,
        /// Flow JSON file; the built-in flow is used when omitted.
        #[arg(long)]
        flow: Option<PathBuf>,
        /// Sender id for the conversation.
        #[arg(long, default_value = "cli")]
        sender: String,
        /// Channel the messages arrive on.
        #[arg(long, default_value = "messenger")]
        channel: Channel,
        /// Print one JSON object per turn instead of plain text.
        #[arg(long)]
        json: bool,
    },
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

#[derive(Debug, Subcommand)]
pub enum FlowCommand {
    /// Parse and validate a flow definition file.
    Validate {
        /// Path to the flow JSON.
        file: PathBuf,
    },
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path in `DMFY_CONFIG` (or
/// `config.toml`).  A missing file yields the defaults.
pub fn load_config() -> anyhow::Result<(dm_domain::config::Config, String)> {
    let config_path = std::env::var("DMFY_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        dm_domain::config::Config::default()
    };

    Ok((config, config_path))
}
