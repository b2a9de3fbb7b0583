use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Meta platform (Messenger / Instagram)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Graph API settings shared by the Messenger and Instagram channels.
///
/// Secrets are never stored in the config file; each `*_env` field names
/// the environment variable to read at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessengerConfig {
    #[serde(default = "d_graph_api_base")]
    pub graph_api_base: String,
    #[serde(default = "d_api_version")]
    pub api_version: String,
    /// Env var holding the page access token used by the Send API.
    /// When unset, outbound messages are logged instead of sent.
    #[serde(default = "d_page_access_token_env")]
    pub page_access_token_env: String,
    /// Env var holding the token Meta echoes during webhook verification.
    #[serde(default = "d_verify_token_env")]
    pub verify_token_env: String,
    /// Env var holding the app secret.  When set, `POST /webhook` requires a
    /// valid `X-Hub-Signature-256` header.
    #[serde(default = "d_app_secret_env")]
    pub app_secret_env: String,
    /// Per-message bound on a Send API call.
    #[serde(default = "d_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            graph_api_base: d_graph_api_base(),
            api_version: d_api_version(),
            page_access_token_env: d_page_access_token_env(),
            verify_token_env: d_verify_token_env(),
            app_secret_env: d_app_secret_env(),
            send_timeout_ms: d_send_timeout_ms(),
        }
    }
}

/// Read a non-empty environment variable.
pub fn read_secret_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn d_graph_api_base() -> String {
    "https://graph.facebook.com".into()
}
fn d_api_version() -> String {
    "v20.0".into()
}
fn d_page_access_token_env() -> String {
    "PAGE_ACCESS_TOKEN".into()
}
fn d_verify_token_env() -> String {
    "VERIFY_TOKEN".into()
}
fn d_app_secret_env() -> String {
    "APP_SECRET".into()
}
fn d_send_timeout_ms() -> u64 {
    5_000
}
