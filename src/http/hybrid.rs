//! Hybrid transport: `POST /message`, MCP-Inspector-compatible.
//!
//! The same route also receives the message posts a real streaming client
//! sends to the URL advertised by `GET /sse`. The two cases are told
//! apart by whether the session has a live `GET /sse` reader attached:
//! if it does, the response is delivered asynchronously on that stream
//! and this handler only acknowledges; if it doesn't — the inspector
//! case, and the unbound case with no `sessionId` at all — the response
//! is framed as a single SSE event directly in the POST response.

use super::AppState;
use crate::mcp::DispatchContext;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;

/// Non-standard extension code for a `sessionId` the dispatcher refuses
/// to accept in production mode.
const SESSION_NOT_FOUND: i64 = -32001;

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

pub async fn handler(State(state): State<AppState>, Query(query): Query<MessageQuery>, body: String) -> Response {
    let sessions = state.core.sessions();

    let session_id = match query.session_id {
        None => None,
        Some(id) if sessions.exists(&id) => Some(id),
        Some(id) if state.debug => {
            sessions.open_with_id(id.clone());
            Some(id)
        }
        Some(_) => return sse_error_frame(SESSION_NOT_FOUND, "unknown session id"),
    };

    let streaming = session_id.as_deref().map(|id| sessions.is_attached(id)).unwrap_or(false);
    let ctx = session_id.map(DispatchContext::bound).unwrap_or_else(DispatchContext::unbound);

    let response = state.core.handle_message(&ctx, &body).await;

    let Some(response) = response else {
        // Streaming clients get 204 for notifications per the message-post
        // contract; the inspector (unattached) case acknowledges with 202
        // with an empty body per spec.md §4.7/§6.1.
        let status = if streaming { StatusCode::NO_CONTENT } else { StatusCode::ACCEPTED };
        return status.into_response();
    };

    if streaming {
        let session_id = ctx.session_id.expect("streaming path always carries a bound session id");
        if sessions.deliver(&session_id, response).await.is_err() {
            tracing::warn!(session_id = %session_id, "session closed before response could be delivered");
        }
        return StatusCode::ACCEPTED.into_response();
    }

    sse_frame(response)
}

fn sse_frame(value: serde_json::Value) -> Response {
    let data = serde_json::to_string(&value).unwrap_or_default();
    (StatusCode::OK, [(axum::http::header::CONTENT_TYPE, "text/event-stream")], format!("data: {data}\n\n")).into_response()
}

fn sse_error_frame(code: i64, message: &str) -> Response {
    sse_frame(json!({"jsonrpc": "2.0", "id": null, "error": {"code": code, "message": message}}))
}

#[cfg(test)]
mod tests;
