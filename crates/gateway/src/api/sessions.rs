//! `GET /api/sessions/:tenant`: live conversations of one tenant.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use dm_domain::Channel;
use dm_sessions::Session;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionView {
    session_key: String,
    session_id: String,
    sender_id: String,
    channel: Channel,
    current_node_id: String,
    variables: BTreeMap<String, String>,
    turns: usize,
    created_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
}

impl From<Session> for SessionView {
    fn from(s: Session) -> Self {
        Self {
            turns: s.history.len(),
            session_key: s.session_key,
            session_id: s.session_id,
            sender_id: s.sender_id,
            channel: s.channel,
            current_node_id: s.current_node_id,
            variables: s.variables,
            created_at: s.created_at,
            last_activity_at: s.last_activity_at,
        }
    }
}

/// Most recently active first.
pub async fn list_sessions(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
) -> impl IntoResponse {
    let sessions: Vec<SessionView> = state
        .sessions
        .list(&tenant)
        .into_iter()
        .map(SessionView::from)
        .collect();
    Json(serde_json::json!({
        "ok": true,
        "tenant": tenant,
        "count": sessions.len(),
        "sessions": sessions,
    }))
}
