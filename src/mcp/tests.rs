use super::*;
use crate::tools::{Tool, ToolDescriptor};
use async_trait::async_trait;

struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "echo".to_string(),
            description: "echoes arguments back".to_string(),
            input_schema: json!({"type": "object", "properties": {"action": {"type": "string"}}, "required": ["action"]}),
        }
    }

    async fn call(&self, arguments: Value) -> ToolResult {
        ToolResult::success(&arguments)
    }
}

fn core_with_echo() -> McpCore {
    let registry = Arc::new(ToolRegistry::new());
    registry.register(Arc::new(EchoTool));
    McpCore::new(registry, SessionManager::new())
}

#[tokio::test]
async fn malformed_json_yields_parse_error() {
    let core = core_with_echo();
    let response = core.handle_message(&DispatchContext::unbound(), "{not json").await.unwrap();
    assert_eq!(response["error"]["code"], json!(PARSE_ERROR));
}

#[tokio::test]
async fn unknown_method_yields_method_not_found() {
    let core = core_with_echo();
    let raw = json!({"jsonrpc": "2.0", "id": 1, "method": "nonexistent"}).to_string();
    let response = core.handle_message(&DispatchContext::unbound(), &raw).await.unwrap();
    assert_eq!(response["error"]["code"], json!(METHOD_NOT_FOUND));
}

#[tokio::test]
async fn initialize_preserves_request_id_and_advertises_capabilities() {
    let core = core_with_echo();
    let raw = json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {"protocolVersion": PROTOCOL_VERSION}}).to_string();
    let response = core.handle_message(&DispatchContext::unbound(), &raw).await.unwrap();
    assert_eq!(response["id"], json!(1));
    assert_eq!(response["result"]["protocolVersion"], json!(PROTOCOL_VERSION));
    assert_eq!(response["result"]["capabilities"]["tools"], json!({}));
}

#[tokio::test]
async fn initialized_notification_returns_none() {
    let core = core_with_echo();
    let raw = json!({"jsonrpc": "2.0", "method": "initialized"}).to_string();
    let response = core.handle_message(&DispatchContext::unbound(), &raw).await;
    assert!(response.is_none());
}

#[tokio::test]
async fn tools_list_enumerates_registered_tools() {
    let core = core_with_echo();
    let raw = json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}).to_string();
    let response = core.handle_message(&DispatchContext::unbound(), &raw).await.unwrap();
    let names: Vec<&str> = response["result"]["tools"].as_array().unwrap().iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["echo"]);
}

#[tokio::test]
async fn tools_call_before_initialize_on_bound_session_is_rejected() {
    let core = core_with_echo();
    let (session_id, _rx) = core.sessions().open();
    let ctx = DispatchContext::bound(session_id);
    let raw = json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {"name": "echo", "arguments": {}}}).to_string();
    let response = core.handle_message(&ctx, &raw).await.unwrap();
    assert_eq!(response["error"]["code"], json!(SESSION_NOT_READY));
}

#[tokio::test]
async fn tools_call_on_unbound_session_bypasses_ready_gate() {
    let core = core_with_echo();
    let raw = json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {"name": "echo", "arguments": {"action": "ping"}}}).to_string();
    let response = core.handle_message(&DispatchContext::unbound(), &raw).await.unwrap();
    assert!(response["result"].is_object());
}

#[tokio::test]
async fn tools_call_after_initialize_succeeds_and_preserves_id() {
    let core = core_with_echo();
    let (session_id, _rx) = core.sessions().open();
    let ctx = DispatchContext::bound(session_id.clone());

    let init_raw = json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {"protocolVersion": PROTOCOL_VERSION}}).to_string();
    core.handle_message(&ctx, &init_raw).await;

    let raw = json!({"jsonrpc": "2.0", "id": "call-1", "method": "tools/call", "params": {"name": "echo", "arguments": {"action": "ping"}}}).to_string();
    let response = core.handle_message(&ctx, &raw).await.unwrap();
    assert_eq!(response["id"], json!("call-1"));
    assert!(response["result"]["content"].is_array());
}

#[tokio::test]
async fn tools_call_with_unknown_tool_name_is_method_not_found() {
    let core = core_with_echo();
    let raw = json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "nope", "arguments": {}}}).to_string();
    let response = core.handle_message(&DispatchContext::unbound(), &raw).await.unwrap();
    assert_eq!(response["error"]["code"], json!(METHOD_NOT_FOUND));
}

#[tokio::test]
async fn ping_returns_minimal_result() {
    let core = core_with_echo();
    let raw = json!({"jsonrpc": "2.0", "id": 9, "method": "ping"}).to_string();
    let response = core.handle_message(&DispatchContext::unbound(), &raw).await.unwrap();
    assert_eq!(response["result"], json!({}));
}

#[test]
fn is_notification_detects_missing_id() {
    assert!(is_notification(&json!({"jsonrpc": "2.0", "method": "initialized"}).to_string()));
    assert!(!is_notification(&json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}).to_string()));
}
