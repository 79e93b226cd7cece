//! `resources` tool: search/list/CRUD over tenant resources, plus bulk
//! operations, state transitions, metrics and tags.

use super::{Tool, ToolDescriptor, ToolResult, base_schema};
use crate::config::ResourcesConfig;
use crate::error::GatewayError;
use crate::upstream::UpstreamClient;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

const ACTIONS: &[&str] = &[
    "list",
    "get",
    "getDetailed",
    "getMinimal",
    "create",
    "update",
    "delete",
    "search",
    "bulkUpdate",
    "bulkDelete",
    "getResourceTypes",
    "changeState",
    "getMetrics",
    "getTags",
    "updateTags",
];

/// Declared filter fields serialized onto the `resources/search` query
/// string when present and non-empty.
const FILTER_FIELDS: &[&str] = &["name", "hostName", "ipAddress", "type", "resourceType", "state", "status", "location"];

/// Fields retained by the minimal resource projection.
const MINIMAL_FIELDS: &[&str] = &["id", "name", "type", "resourceType", "state", "status", "tags", "createdDate", "updatedDate"];

/// Translates `resources` tool actions into calls against
/// `/api/v2/tenants/{tenant_id}/resources/...`.
pub struct ResourcesAdapter {
    client: Arc<UpstreamClient>,
    resources_config: ResourcesConfig,
}

impl ResourcesAdapter {
    pub fn new(client: Arc<UpstreamClient>, resources_config: ResourcesConfig) -> Self {
        Self { client, resources_config }
    }

    fn base(&self) -> String {
        format!("/api/v2/tenants/{}/resources", self.client.tenant_id())
    }

    /// Serializes `params` (plus pagination) into a query string. Booleans
    /// are lowercased `true`/`false`; only non-empty declared filter
    /// fields are included.
    pub async fn search(&self, params: Option<&Value>) -> Result<Value, GatewayError> {
        let empty = Value::Object(Default::default());
        let params = params.unwrap_or(&empty);

        let page_no = params.get("pageNo").and_then(Value::as_u64).unwrap_or(1);
        let requested_size = params.get("pageSize").and_then(Value::as_u64).unwrap_or(self.resources_config.default_page_size as u64);
        let page_size = requested_size.min(self.resources_config.max_page_size as u64);

        let mut query_pairs: Vec<(String, String)> = vec![("pageNo".to_string(), page_no.to_string()), ("pageSize".to_string(), page_size.to_string())];

        if let Value::Object(map) = params {
            for field in FILTER_FIELDS {
                match map.get(*field) {
                    Some(Value::String(s)) if !s.is_empty() => query_pairs.push((field.to_string(), s.clone())),
                    Some(Value::Bool(b)) => query_pairs.push((field.to_string(), b.to_string())),
                    Some(Value::Number(n)) => query_pairs.push((field.to_string(), n.to_string())),
                    _ => {}
                }
            }
        }

        let query = query_pairs.iter().map(|(k, v)| format!("{}={}", k, urlencoding::encode(v))).collect::<Vec<_>>().join("&");

        let value = self.client.get(&format!("{}/search?{query}", self.base())).await?;
        Ok(super::decode_results_tolerant(value))
    }

    pub async fn get(&self, id: &str) -> Result<Value, GatewayError> {
        self.client.get(&format!("{}/{id}", self.base())).await
    }

    pub async fn get_detailed(&self, id: &str) -> Result<Value, GatewayError> {
        self.get(id).await
    }

    /// Projects the minimal identification/state/tags/timestamps view
    /// over `get`.
    pub async fn get_minimal(&self, id: &str) -> Result<Value, GatewayError> {
        let full = self.get(id).await?;
        Ok(project_minimal(&full))
    }

    pub async fn create(&self, config: &Value) -> Result<Value, GatewayError> {
        self.client.post(&self.base(), Some(config)).await
    }

    pub async fn update(&self, id: &str, config: &Value) -> Result<Value, GatewayError> {
        self.client.post(&format!("{}/{id}", self.base()), Some(config)).await
    }

    pub async fn delete(&self, id: &str) -> Result<Value, GatewayError> {
        self.client.delete(&format!("{}/{id}", self.base())).await
    }

    pub async fn bulk_update(&self, resource_ids: &[Value], updates: &Value) -> Result<Value, GatewayError> {
        let body = json!({"resourceIds": resource_ids, "updates": updates});
        self.client.post(&format!("{}/bulk-update", self.base()), Some(&body)).await
    }

    pub async fn bulk_delete(&self, resource_ids: &[Value]) -> Result<Value, GatewayError> {
        let body = json!({"resourceIds": resource_ids});
        self.client.post(&format!("{}/bulk-delete", self.base()), Some(&body)).await
    }

    pub async fn get_resource_types(&self) -> Result<Value, GatewayError> {
        let value = self.client.get(&format!("{}/types", self.base())).await?;
        Ok(super::decode_results_tolerant(value))
    }

    pub async fn change_state(&self, id: &str, state: &str) -> Result<Value, GatewayError> {
        let body = json!({"state": state});
        self.client.post(&format!("{}/{id}/state", self.base()), Some(&body)).await
    }

    pub async fn get_metrics(&self, id: &str, metric_request: Option<&Value>) -> Result<Value, GatewayError> {
        let body = metric_request.cloned().unwrap_or_else(|| json!({}));
        self.client.post(&format!("{}/{id}/metrics", self.base()), Some(&body)).await
    }

    pub async fn get_tags(&self, id: &str) -> Result<Value, GatewayError> {
        let value = self.client.get(&format!("{}/{id}/tags", self.base())).await?;
        Ok(super::decode_results_tolerant(value))
    }

    pub async fn update_tags(&self, id: &str, tags: &Value) -> Result<Value, GatewayError> {
        let body = json!({"tags": tags});
        self.client.post(&format!("{}/{id}/tags", self.base()), Some(&body)).await
    }
}

fn project_minimal(full: &Value) -> Value {
    let Some(obj) = full.as_object() else { return full.clone() };
    let mut projected = serde_json::Map::new();
    for field in MINIMAL_FIELDS {
        if let Some(value) = obj.get(*field) {
            projected.insert(field.to_string(), value.clone());
        }
    }
    Value::Object(projected)
}

/// MCP `resources` tool: validates inputs per action, routes to the
/// adapter, and classifies adapter failures into the `is_error` envelope
pub struct ResourcesTool {
    adapter: ResourcesAdapter,
}

impl ResourcesTool {
    pub fn new(client: Arc<UpstreamClient>, resources_config: ResourcesConfig) -> Self {
        Self { adapter: ResourcesAdapter::new(client, resources_config) }
    }
}

#[async_trait]
impl Tool for ResourcesTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "resources".to_string(),
            description: "Search, inspect, create, update, and manage tenant resources: bulk operations, state transitions, metrics, and tags.".to_string(),
            input_schema: base_schema(
                ACTIONS,
                json!({
                    "id": {"type": "string", "description": "Resource id, required for get/update/delete/changeState/getMetrics/getTags/updateTags"},
                    "config": {"type": "object", "description": "Resource payload for create/update"},
                    "params": {"type": "object", "description": "Search filters and pagination for list/search"},
                    "resourceIds": {"type": "array", "items": {"type": "string"}, "description": "Resource ids for bulkUpdate/bulkDelete"},
                    "updates": {"type": "object", "description": "Fields to apply in bulkUpdate"},
                    "state": {"type": "string", "description": "Target state for changeState"},
                    "metricRequest": {"type": "object", "description": "Metric query for getMetrics"},
                    "tags": {"type": "object", "description": "Tags payload for updateTags"}
                }),
            ),
        }
    }

    async fn call(&self, arguments: Value) -> ToolResult {
        let action = match super::require_str(&arguments, "action", "Action") {
            Ok(a) => a,
            Err(result) => return result,
        };

        let outcome = match action {
            "list" | "search" => self.adapter.search(arguments.get("params")).await,
            "get" | "getDetailed" => match super::require_str(&arguments, "id", "Resource ID") {
                Ok(id) => if action == "get" { self.adapter.get(id).await } else { self.adapter.get_detailed(id).await },
                Err(result) => return result,
            },
            "getMinimal" => match super::require_str(&arguments, "id", "Resource ID") {
                Ok(id) => self.adapter.get_minimal(id).await,
                Err(result) => return result,
            },
            "create" => match super::require_object(&arguments, "config", "Config") {
                Ok(config) => self.adapter.create(&Value::Object(config.clone())).await,
                Err(result) => return result,
            },
            "update" => {
                let id = match super::require_str(&arguments, "id", "Resource ID") {
                    Ok(id) => id.to_string(),
                    Err(result) => return result,
                };
                let config = match super::require_object(&arguments, "config", "Config") {
                    Ok(config) => config.clone(),
                    Err(result) => return result,
                };
                self.adapter.update(&id, &Value::Object(config)).await
            }
            "delete" => match super::require_str(&arguments, "id", "Resource ID") {
                Ok(id) => self.adapter.delete(id).await,
                Err(result) => return result,
            },
            "bulkUpdate" => {
                let ids = match super::require_non_empty_array(&arguments, "resourceIds", "resourceIds") {
                    Ok(ids) => ids.clone(),
                    Err(result) => return result,
                };
                let updates = arguments.get("updates").cloned().unwrap_or_else(|| json!({}));
                self.adapter.bulk_update(&ids, &updates).await
            }
            "bulkDelete" => match super::require_non_empty_array(&arguments, "resourceIds", "resourceIds") {
                Ok(ids) => self.adapter.bulk_delete(ids).await,
                Err(result) => return result,
            },
            "getResourceTypes" => self.adapter.get_resource_types().await,
            "changeState" => {
                let id = match super::require_str(&arguments, "id", "Resource ID") {
                    Ok(id) => id.to_string(),
                    Err(result) => return result,
                };
                let state = match super::require_str(&arguments, "state", "state") {
                    Ok(state) => state.to_string(),
                    Err(result) => return result,
                };
                self.adapter.change_state(&id, &state).await
            }
            "getMetrics" => match super::require_str(&arguments, "id", "Resource ID") {
                Ok(id) => self.adapter.get_metrics(id, arguments.get("metricRequest")).await,
                Err(result) => return result,
            },
            "getTags" => match super::require_str(&arguments, "id", "Resource ID") {
                Ok(id) => self.adapter.get_tags(id).await,
                Err(result) => return result,
            },
            "updateTags" => {
                let id = match super::require_str(&arguments, "id", "Resource ID") {
                    Ok(id) => id.to_string(),
                    Err(result) => return result,
                };
                let tags = arguments.get("tags").cloned().unwrap_or_else(|| json!({}));
                self.adapter.update_tags(&id, &tags).await
            }
            other => return ToolResult::error(format!("unknown action '{other}' for tool 'resources'")),
        };

        result_to_tool_result(action, outcome)
    }
}

fn result_to_tool_result(action: &str, outcome: Result<Value, GatewayError>) -> ToolResult {
    match outcome {
        Ok(value) => {
            crate::telemetry::record_tool_call("resources", action, false);
            ToolResult::success(&value)
        }
        Err(GatewayError::Upstream(err)) => {
            crate::telemetry::record_tool_call("resources", action, true);
            ToolResult::from_upstream_error(&err)
        }
        Err(other) => {
            crate::telemetry::record_tool_call("resources", action, true);
            ToolResult::error(other.to_string())
        }
    }
}
