//! Tool execution layer: named tools (`integrations`, `resources`) that
//! dispatch an `action` string to the upstream API.

pub mod integrations;
pub mod resources;

use crate::error::UpstreamError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Value, json};
use std::sync::Arc;

/// A tool's JSON-Schema-described input contract and documentation
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// A tool invocation's outcome: business failures live inside the envelope,
/// never as a transport error.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolResult {
    pub content: Vec<ContentBlock>,
    #[serde(rename = "isError", skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub content_type: &'static str,
    pub text: String,
}

impl ToolResult {
    pub fn success(value: &Value) -> Self {
        let text = if value.is_null() {
            "null".to_string()
        } else {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        };
        Self { content: vec![ContentBlock { content_type: "text", text }], is_error: false }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { content: vec![ContentBlock { content_type: "text", text: message.into() }], is_error: true }
    }

    pub fn from_upstream_error(err: &UpstreamError) -> Self {
        Self::error(err.display_message())
    }
}

/// A registered tool. Implementations own input validation, action
/// routing, and classification of adapter failures into the result
/// envelope.
#[async_trait]
pub trait Tool: Send + Sync {
    fn descriptor(&self) -> ToolDescriptor;
    async fn call(&self, arguments: Value) -> ToolResult;
}

/// Extracts a required string field from the arguments object, returning
/// an `is_error` envelope (not an `Err`) when absent — handlers never
/// raise a transport-level error for missing business input.
pub fn require_str<'a>(arguments: &'a Value, field: &str, context: &str) -> Result<&'a str, ToolResult> {
    arguments
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolResult::error(format!("{context} is required")))
}

pub fn require_object<'a>(arguments: &'a Value, field: &str, context: &str) -> Result<&'a serde_json::Map<String, Value>, ToolResult> {
    arguments
        .get(field)
        .and_then(Value::as_object)
        .ok_or_else(|| ToolResult::error(format!("{context} is required")))
}

pub fn optional_object<'a>(arguments: &'a Value, field: &str) -> Option<&'a serde_json::Map<String, Value>> {
    arguments.get(field).and_then(Value::as_object)
}

pub fn require_non_empty_array<'a>(arguments: &'a Value, field: &str, context: &str) -> Result<&'a Vec<Value>, ToolResult> {
    arguments
        .get(field)
        .and_then(Value::as_array)
        .filter(|arr| !arr.is_empty())
        .ok_or_else(|| ToolResult::error(format!("{context} is required and must be non-empty")))
}

/// Decode a collection payload that upstream may wrap as `{"results": [...]}`
/// or return as a bare top-level array.
pub fn decode_results_tolerant(value: Value) -> Value {
    match value {
        Value::Array(_) => value,
        Value::Object(ref map) => {
            if let Some(results) = map.get("results") {
                results.clone()
            } else {
                value
            }
        }
        other => other,
    }
}

/// Decode a singleton payload that upstream may return bare or wrapped
/// under one of a fixed set of keys.
pub fn decode_singleton_tolerant(value: Value, wrapper_keys: &[&str]) -> Value {
    if let Value::Object(ref map) = value {
        for key in wrapper_keys {
            if let Some(inner) = map.get(*key) {
                return inner.clone();
            }
        }
    }
    value
}

/// Registry of named tools, mutated only during startup registration
#[derive(Default)]
pub struct ToolRegistry {
    tools: DashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: DashMap::new() }
    }

    pub fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.descriptor().name.clone();
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|entry| entry.value().clone())
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|entry| entry.value().descriptor()).collect()
    }
}

/// Shared `{action, id?, config?}`-shaped schema used by both tools as a
/// starting template; each tool extends it with its own `action` enum
/// and extra properties.
pub fn base_schema(actions: &[&str], extra_properties: Value) -> Value {
    let mut properties = json!({
        "action": {
            "type": "string",
            "enum": actions,
            "description": "The operation to perform"
        }
    });
    if let (Some(props), Some(extra)) = (properties.as_object_mut(), extra_properties.as_object()) {
        for (k, v) in extra {
            props.insert(k.clone(), v.clone());
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": ["action"]
    })
}
