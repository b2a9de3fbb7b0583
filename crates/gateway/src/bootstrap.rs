//! AppState construction and background-task spawning.

use std::sync::Arc;
use std::time::Duration;

use dm_channels::{DryRunDispatcher, GraphApiDispatcher, MessageDispatcher};
use dm_domain::config::{read_secret_env, Config, ConfigSeverity};

use crate::state::{AppState, Secrets};

/// Validate config, read secrets and return a fully-wired [`AppState`].
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let errors = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if errors > 0 {
        anyhow::bail!("config validation failed with {errors} error(s)");
    }

    let messenger = &config.messenger;

    // ── Dispatcher ───────────────────────────────────────────────────
    let dispatcher: Arc<dyn MessageDispatcher> =
        match read_secret_env(&messenger.page_access_token_env) {
            Some(token) => {
                let client = GraphApiDispatcher::new(messenger, token)?;
                tracing::info!(endpoint = %client.endpoint(), "Graph API dispatcher ready");
                Arc::new(client)
            }
            None => {
                tracing::warn!(
                    env_var = %messenger.page_access_token_env,
                    "page access token not set, replies will only be logged"
                );
                Arc::new(DryRunDispatcher)
            }
        };

    // ── Secrets ──────────────────────────────────────────────────────
    let secrets = Secrets {
        verify_token: read_secret_env(&messenger.verify_token_env),
        app_secret: read_secret_env(&messenger.app_secret_env),
        api_token: read_secret_env(&config.server.api_token_env),
    };
    if secrets.verify_token.is_none() {
        tracing::warn!(
            env_var = %messenger.verify_token_env,
            "verify token not set, webhook verification will be refused"
        );
    }
    if secrets.app_secret.is_some() {
        tracing::info!("webhook signature verification enabled");
    }
    match secrets.api_token {
        Some(_) => tracing::info!(
            env_var = %config.server.api_token_env,
            "API bearer-token auth enabled"
        ),
        None => tracing::warn!(
            env_var = %config.server.api_token_env,
            "API token not set, /api routes are unauthenticated"
        ),
    }

    Ok(AppState::new(config, dispatcher, secrets))
}

/// Spawn the periodic sweeps.  Only the HTTP server needs them.
pub fn spawn_background_tasks(state: &AppState) {
    // ── Expired session + idle lock pruning ──────────────────────────
    let sessions = state.sessions.clone();
    let engine = state.engine.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let expired = sessions.prune_expired(chrono::Utc::now());
            engine.locks().prune_idle();
            if expired > 0 {
                tracing::debug!(expired, remaining = sessions.len(), "pruned idle sessions");
            }
        }
    });
}
