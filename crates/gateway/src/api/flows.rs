//! Flow admin endpoints.
//!
//! - `POST   /api/flows/publish`  validate and install a flow
//! - `GET    /api/flows`          published flows
//! - `GET    /api/flows/:key`     one tenant's definition
//! - `DELETE /api/flows/:key`     unpublish (tenant reverts to the built-in flow)

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;

use dm_domain::config::DEFAULT_TENANT;
use dm_flows::FlowDefinition;

use super::api_error;
use crate::state::AppState;

/// A flow definition plus the page it is published for.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishBody {
    #[serde(default)]
    pub page_id: Option<String>,
    #[serde(flatten)]
    pub flow: FlowDefinition,
}

impl PublishBody {
    /// `pageId` when present and non-empty, else `"default"`.
    pub fn key(&self) -> &str {
        self.page_id
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_TENANT)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /api/flows/publish
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The body is parsed by hand so malformed JSON gets the same
/// `{ ok: false }` shape as a validation failure.
pub async fn publish_flow(State(state): State<AppState>, body: Bytes) -> Response {
    let body: PublishBody = match serde_json::from_slice(&body) {
        Ok(b) => b,
        Err(e) => return api_error(StatusCode::BAD_REQUEST, format!("invalid JSON: {e}")),
    };
    let key = body.key().to_owned();

    match state.flows.publish(&key, body.flow) {
        Ok(id) => {
            tracing::info!(key = %key, flow_id = %id, "flow published");
            Json(json!({ "ok": true, "key": key, "id": id })).into_response()
        }
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "flow rejected");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "ok": false,
                    "error": e.to_string(),
                    "field": e.field(),
                })),
            )
                .into_response()
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /api/flows, GET|DELETE /api/flows/:key
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn list_flows(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "ok": true, "flows": state.flows.list() }))
}

pub async fn get_flow(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    match state.flows.get(&key) {
        Some(flow) => Json(json!({ "ok": true, "flow": flow })).into_response(),
        None => api_error(StatusCode::NOT_FOUND, "flow not found"),
    }
}

pub async fn delete_flow(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    if state.flows.remove(&key) {
        tracing::info!(key = %key, "flow unpublished");
        Json(json!({ "ok": true })).into_response()
    } else {
        api_error(StatusCode::NOT_FOUND, "flow not found")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_defaults_without_page_id() {
        let body: PublishBody =
            serde_json::from_str(r#"{ "name": "x", "nodes": [] }"#).unwrap();
        assert_eq!(body.key(), "default");

        let body: PublishBody =
            serde_json::from_str(r#"{ "pageId": " ", "nodes": [] }"#).unwrap();
        assert_eq!(body.key(), "default");
    }

    #[test]
    fn page_id_is_the_key_and_not_part_of_the_flow() {
        let body: PublishBody = serde_json::from_str(
            r#"{ "pageId": "123", "name": "Sales", "version": 2, "entryNodeId": "a",
                 "nodes": [{ "id": "a" }] }"#,
        )
        .unwrap();
        assert_eq!(body.key(), "123");
        assert_eq!(body.flow.name, "Sales");
        assert_eq!(body.flow.version, "2");
        assert_eq!(body.flow.nodes.len(), 1);
    }
}
