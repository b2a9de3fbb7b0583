use std::sync::Arc;

use sha2::{Digest, Sha256};

use dm_channels::MessageDispatcher;
use dm_domain::config::Config;
use dm_flows::{FlowEngine, FlowStore};
use dm_sessions::SessionStore;

/// Secrets read from the environment at startup.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    /// Token Meta must echo during `GET /webhook` verification.
    pub verify_token: Option<String>,
    /// App secret for `X-Hub-Signature-256` checks on `POST /webhook`.
    pub app_secret: Option<String>,
    /// Bearer token for `/api/*`.
    pub api_token: Option<String>,
}

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    // ── Conversation runtime ──────────────────────────────────────────
    pub engine: Arc<FlowEngine>,
    pub flows: Arc<FlowStore>,
    pub sessions: Arc<SessionStore>,
    pub dispatcher: Arc<dyn MessageDispatcher>,

    // ── Security ──────────────────────────────────────────────────────
    pub verify_token: Option<Arc<str>>,
    pub app_secret: Option<Arc<str>>,
    /// SHA-256 of the API token; `None` leaves `/api/*` open.
    pub api_token_hash: Option<Vec<u8>>,
}

impl AppState {
    /// Wire fresh in-memory stores around `dispatcher`.
    pub fn new(config: Arc<Config>, dispatcher: Arc<dyn MessageDispatcher>, secrets: Secrets) -> Self {
        let flows = Arc::new(FlowStore::new());
        let sessions = Arc::new(SessionStore::new(&config.sessions));
        let engine = Arc::new(FlowEngine::new(flows.clone(), sessions.clone()));

        Self {
            config,
            engine,
            flows,
            sessions,
            dispatcher,
            verify_token: secrets.verify_token.map(Arc::from),
            app_secret: secrets.app_secret.map(Arc::from),
            api_token_hash: secrets
                .api_token
                .map(|t| Sha256::digest(t.as_bytes()).to_vec()),
        }
    }
}
