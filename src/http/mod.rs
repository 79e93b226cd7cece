//! HTTP surface: route wiring, shared application state, and the
//! liveness/readiness/diagnostic endpoints.
//!
//! The three MCP transports live in their own modules; this module only
//! assembles them behind a single router and owns the endpoints that are
//! not part of the protocol itself.

pub mod direct;
pub mod hybrid;
pub mod sse;

use crate::mcp::McpCore;
use axum::Router;
use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub core: Arc<McpCore>,
    pub debug: bool,
    pub start_time: Instant,
}

/// Build the axum router wiring every route onto [`AppState`].
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/sse", get(sse::handler))
        .route("/message", post(hybrid::handler))
        .route("/mcp", post(direct::handler))
        .route("/health", get(health_handler))
        .route("/readiness", get(readiness_handler))
        .route("/debug", get(debug_handler))
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn(record_request_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Records per-handler request count and latency for every route.
async fn record_request_metrics(request: Request, next: Next) -> Response {
    let handler = request.uri().path().to_string();
    let method = request.method().to_string();
    let middleware = crate::telemetry::MetricsMiddleware::new(handler);
    let start = middleware.start();

    let response = next.run(request).await;

    middleware.finish(start, &method, response.status().as_u16());
    response
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let tools: Vec<String> = state.core.registry().descriptors().into_iter().map(|d| d.name).collect();
    Json(json!({
        "status": "ok",
        "uptime": state.start_time.elapsed().as_secs(),
        "service": "opsramp-mcp-gateway",
        "tools": tools,
        "endpoints": {
            "sse": "/sse",
            "message": "/message",
            "mcp": "/mcp",
        },
    }))
}

/// Readiness fails (503) only if the tool registry ended up empty —
/// startup wires tool registration before the router ever accepts
/// traffic, so this mainly guards against a future regression.
async fn readiness_handler(State(state): State<AppState>) -> impl IntoResponse {
    let tools: Vec<String> = state.core.registry().descriptors().into_iter().map(|d| d.name).collect();
    let tools_ready = !tools.is_empty();
    let ready = tools_ready;

    let body = json!({
        "ready": ready,
        "checks": {
            "server": true,
            "sessions": state.core.sessions().len(),
            "tools": tools_ready,
        },
        "tools": tools,
    });

    let status = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(body))
}

/// Prometheus text exposition for scraping.
async fn metrics_handler() -> impl IntoResponse {
    match crate::telemetry::get_metrics() {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct DebugQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

async fn debug_handler(State(state): State<AppState>, Query(query): Query<DebugQuery>) -> impl IntoResponse {
    let mut body = json!({
        "service": "opsramp-mcp-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "protocolVersion": crate::mcp::PROTOCOL_VERSION,
        "debug": state.debug,
        "uptime": state.start_time.elapsed().as_secs(),
        "openSessions": state.core.sessions().len(),
    });

    if let Some(session_id) = query.session_id {
        let known = state.core.sessions().exists(&session_id);
        body["session"] = json!({
            "id": session_id,
            "known": known,
            "info": state.core.sessions().info(&session_id).map(|info| json!({
                "state": format!("{:?}", info.state),
                "protocolVersion": info.protocol_version,
            })),
        });
    }

    Json(body)
}
