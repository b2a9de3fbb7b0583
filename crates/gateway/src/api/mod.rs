pub mod auth;
pub mod flows;
pub mod sessions;
pub mod webhook;

use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full router.
///
/// The webhook routes are **public**: Meta authenticates with the verify
/// token and, when configured, the body signature.  Everything under
/// `/api` sits behind the bearer-token middleware.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(health))
        .route("/webhook", get(webhook::verify).post(webhook::receive));

    let protected = Router::new()
        .route("/api/flows", get(flows::list_flows))
        .route("/api/flows/publish", post(flows::publish_flow))
        .route(
            "/api/flows/:key",
            get(flows::get_flow).delete(flows::delete_flow),
        )
        .route("/api/sessions/:tenant", get(sessions::list_sessions))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_api_token,
        ));

    public.merge(protected)
}

async fn health() -> &'static str {
    "DMFY webhook is live"
}

/// Standard JSON error body: `{ "ok": false, "error": "<message>" }`.
pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "ok": false, "error": message.into() })),
    )
        .into_response()
}
