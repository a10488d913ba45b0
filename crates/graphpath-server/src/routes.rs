//! HTTP routes for the graph endpoint.
//!
//! GET reads the description from the query string. POST and PATCH read
//! posted fields (form-encoded, bracket syntax allowed, or a JSON object)
//! and strip the reserved keys. Every graph response is the engine's
//! `GraphResponse` JSON: 200 unless it is an error envelope, then 400.

use crate::state::AppState;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{RawQuery, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use graphpath_core::{GraphResponse, Verb, parse_nested_query};
use graphpath_runtime::GraphRequest;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/graph",
            get(handle_get)
                .post(handle_post)
                .patch(handle_patch)
                .options(handle_options),
        )
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_get(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let request = GraphRequest::from_query(query.as_deref().unwrap_or(""), state.engine.config());
    respond(state.engine.handle(request).await)
}

async fn handle_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    handle_fields(&state, Verb::Post, &headers, &body).await
}

async fn handle_patch(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    handle_fields(&state, Verb::Patch, &headers, &body).await
}

async fn handle_options(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    respond(
        state
            .engine
            .handle(GraphRequest::new(Verb::Options, Value::Null))
            .await,
    )
}

async fn handle_fields(
    state: &AppState,
    verb: Verb,
    headers: &HeaderMap,
    body: &[u8],
) -> (StatusCode, Json<Value>) {
    let fields = match decode_fields(headers, body) {
        Ok(fields) => fields,
        Err(reason) => {
            tracing::debug!(reason = %reason, "rejecting request body");
            return respond(GraphResponse::error(reason));
        }
    };

    let request = GraphRequest::from_fields(verb, fields, state.engine.config());
    respond(state.engine.handle(request).await)
}

/// Decode a body into posted fields: a JSON object for JSON requests,
/// otherwise a (bracket-encoded) form.
fn decode_fields(headers: &HeaderMap, body: &[u8]) -> Result<Map<String, Value>, String> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    if is_json {
        return match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(fields)) => Ok(fields),
            Ok(_) => Err("Invalid request body: expected a JSON object".to_string()),
            Err(e) => Err(format!("Invalid request body: {}", e)),
        };
    }

    let text = std::str::from_utf8(body).map_err(|e| format!("Invalid request body: {}", e))?;
    Ok(parse_nested_query(text))
}

fn respond(response: GraphResponse) -> (StatusCode, Json<Value>) {
    let status = if response.is_success() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(response.into_value()))
}

async fn healthz() -> Json<Value> {
    Json(json!({ "ok": true, "service": "graphpath-server" }))
}
