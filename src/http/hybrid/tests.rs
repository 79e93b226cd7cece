use super::*;
use crate::mcp::McpCore;
use crate::session::SessionManager;
use crate::tools::{Tool, ToolDescriptor, ToolRegistry, ToolResult};
use async_trait::async_trait;
use axum::body::to_bytes;
use axum::extract::{Query, State};
use serde_json::json;
use std::sync::Arc;

struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor { name: "echo".to_string(), description: "echoes".to_string(), input_schema: json!({"type": "object"}) }
    }

    async fn call(&self, arguments: serde_json::Value) -> ToolResult {
        ToolResult::success(&arguments)
    }
}

fn test_state(debug: bool) -> super::super::AppState {
    let registry = Arc::new(ToolRegistry::new());
    registry.register(Arc::new(EchoTool));
    let core = Arc::new(McpCore::new(registry, SessionManager::new()));
    super::super::AppState { core, debug, start_time: std::time::Instant::now() }
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn ack_with_no_session_id_frames_response_inline() {
    let state = test_state(false);
    let raw = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}).to_string();
    let response = handler(State(state), Query(MessageQuery { session_id: None }), raw).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.starts_with("data: "));
    assert!(body.contains("\"result\""));
}

#[tokio::test]
async fn notification_with_no_session_id_acknowledges_with_202() {
    let state = test_state(false);
    let raw = json!({"jsonrpc": "2.0", "method": "initialized"}).to_string();
    let response = handler(State(state), Query(MessageQuery { session_id: None }), raw).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn notification_on_attached_streaming_session_returns_no_content() {
    let state = test_state(false);
    let (session_id, _rx) = state.core.sessions().open();
    state.core.sessions().mark_attached(&session_id);

    let raw = json!({"jsonrpc": "2.0", "method": "initialized"}).to_string();
    let response = handler(State(state), Query(MessageQuery { session_id: Some(session_id) }), raw).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn unknown_session_in_production_mode_is_rejected() {
    let state = test_state(false);
    let raw = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}).to_string();
    let response = handler(State(state), Query(MessageQuery { session_id: Some("ghost".to_string()) }), raw).await;
    let body = body_text(response).await;
    assert!(body.contains(&SESSION_NOT_FOUND.to_string()));
}

#[tokio::test]
async fn unknown_session_in_debug_mode_is_registered_on_the_fly() {
    let state = test_state(true);
    let raw = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}).to_string();
    let response = handler(State(state.clone()), Query(MessageQuery { session_id: Some("fresh-id".to_string()) }), raw).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(state.core.sessions().exists("fresh-id"));
}

#[tokio::test]
async fn attached_session_acknowledges_and_delivers_on_the_channel() {
    let state = test_state(false);
    let (session_id, mut rx) = state.core.sessions().open();
    state.core.sessions().mark_attached(&session_id);

    let raw = json!({"jsonrpc": "2.0", "id": "x", "method": "ping"}).to_string();
    let response = handler(State(state), Query(MessageQuery { session_id: Some(session_id) }), raw).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let delivered = rx.recv().await.unwrap();
    assert_eq!(delivered["id"], json!("x"));
}
