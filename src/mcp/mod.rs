//! MCP protocol core: the JSON-RPC 2.0 method dispatcher shared by every
//! transport variant.
//!
//! The source depends on a vendored MCP framework; this crate implements
//! the small subset of JSON-RPC 2.0 it actually needs directly rather than
//! re-adopting one.

use crate::session::SessionManager;
use crate::tools::{ToolRegistry, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

/// Protocol version this gateway speaks.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
/// Non-standard extension code: `tools/call` dispatched before the
/// session reached READY.
const SESSION_NOT_READY: i64 = -32002;

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: Option<String>,
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Serialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self { jsonrpc: "2.0", id, result: Some(result), error: None }
    }

    fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self { jsonrpc: "2.0", id, result: None, error: Some(JsonRpcErrorObject { code, message: message.into() }) }
    }
}

/// Whether a dispatched message is bound to a session, and whether that
/// binding requires the READY gate before `tools/call` is allowed
///. The direct transport passes `None`; the streaming and
/// hybrid transports pass `Some`.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    pub session_id: Option<String>,
}

impl DispatchContext {
    pub fn unbound() -> Self {
        Self { session_id: None }
    }

    pub fn bound(session_id: impl Into<String>) -> Self {
        Self { session_id: Some(session_id.into()) }
    }
}

/// Owns the tool registry and session manager and dispatches JSON-RPC 2.0
/// method calls into them.
#[derive(Clone)]
pub struct McpCore {
    registry: Arc<ToolRegistry>,
    sessions: SessionManager,
}

impl McpCore {
    pub fn new(registry: Arc<ToolRegistry>, sessions: SessionManager) -> Self {
        Self { registry, sessions }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Parse and dispatch one JSON-RPC message. Returns `None` for
    /// notifications (no `id`, e.g. `initialized`), which never produce a
    /// response frame.
    pub async fn handle_message(&self, ctx: &DispatchContext, raw: &str) -> Option<Value> {
        let parsed: Result<JsonRpcRequest, _> = serde_json::from_str(raw);
        let request = match parsed {
            Ok(request) => request,
            Err(e) => return Some(serde_json::to_value(JsonRpcResponse::error(Value::Null, PARSE_ERROR, format!("parse error: {e}"))).unwrap()),
        };

        let is_notification = request.id.is_none();
        let id = request.id.clone().unwrap_or(Value::Null);

        let result = self.dispatch(ctx, &request).await;

        if is_notification {
            return None;
        }

        let response = match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err((code, message)) => JsonRpcResponse::error(id, code, message),
        };
        Some(serde_json::to_value(response).unwrap())
    }

    async fn dispatch(&self, ctx: &DispatchContext, request: &JsonRpcRequest) -> Result<Value, (i64, String)> {
        match request.method.as_str() {
            "initialize" => Ok(self.handle_initialize(ctx, &request.params)),
            "initialized" => {
                if let Some(session_id) = &ctx.session_id {
                    self.sessions.mark_ready(session_id, PROTOCOL_VERSION.to_string());
                }
                Ok(Value::Null)
            }
            "tools/list" => Ok(self.handle_tools_list()),
            "tools/call" => self.handle_tools_call(ctx, &request.params).await,
            "ping" => Ok(json!({})),
            other => Err((METHOD_NOT_FOUND, format!("method not found: {other}"))),
        }
    }

    /// `initialize` is idempotent and replaces `protocol_version`; it also
    /// advances the session straight to READY.
    fn handle_initialize(&self, ctx: &DispatchContext, params: &Value) -> Value {
        let negotiated = params.get("protocolVersion").and_then(Value::as_str).unwrap_or(PROTOCOL_VERSION).to_string();

        if let Some(session_id) = &ctx.session_id {
            self.sessions.mark_ready(session_id, negotiated.clone());
        }

        json!({
            "protocolVersion": negotiated,
            "capabilities": {"tools": {}},
            "serverInfo": {"name": "opsramp-mcp-gateway", "version": env!("CARGO_PKG_VERSION")},
        })
    }

    fn handle_tools_list(&self) -> Value {
        let tools: Vec<Value> = self.registry.descriptors().into_iter().map(|d| serde_json::to_value(d).unwrap()).collect();
        json!({"tools": tools})
    }

    async fn handle_tools_call(&self, ctx: &DispatchContext, params: &Value) -> Result<Value, (i64, String)> {
        if let Some(session_id) = &ctx.session_id {
            if !self.sessions.is_ready(session_id) {
                return Err((SESSION_NOT_READY, "session is not initialized".to_string()));
            }
        }

        let name = params.get("name").and_then(Value::as_str).ok_or((INVALID_PARAMS, "params.name is required".to_string()))?;

        let Some(tool) = self.registry.get(name) else {
            return Err((METHOD_NOT_FOUND, format!("unknown tool: {name}")));
        };

        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
        let result: ToolResult = tool.call(arguments).await;
        Ok(serde_json::to_value(result).unwrap())
    }
}

/// Returns true when `raw` is structurally a JSON-RPC notification (no
/// `id` field), without fully deserializing it — used by transports to
/// decide whether to send a `202`/`204` acknowledgement up front.
pub fn is_notification(raw: &str) -> bool {
    serde_json::from_str::<Value>(raw).map(|v| v.get("id").is_none()).unwrap_or(false)
}

#[cfg(test)]
mod tests;
