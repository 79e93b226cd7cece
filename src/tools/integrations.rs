//! `integrations` tool: list/get/create/update/delete/enable/disable
//! installed integrations, plus the read-only type catalog

use super::{Tool, ToolDescriptor, ToolResult, base_schema, decode_results_tolerant, decode_singleton_tolerant};
use crate::error::{ErrorKind, GatewayError, UpstreamError};
use crate::upstream::UpstreamClient;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;

const ACTIONS: &[&str] = &[
    "list", "get", "getDetailed", "create", "update", "delete", "enable", "disable", "listTypes", "getType",
];

/// Wrapper keys tolerated when the upstream API returns a singleton
/// integration.
const SINGLETON_WRAPPERS: &[&str] = &["integration", "result", "data"];

/// Translates `integrations` tool actions into calls against
/// `/api/v2/tenants/{tenant_id}/integrations/...`.
pub struct IntegrationsAdapter {
    client: Arc<UpstreamClient>,
}

impl IntegrationsAdapter {
    pub fn new(client: Arc<UpstreamClient>) -> Self {
        Self { client }
    }

    fn base(&self) -> String {
        format!("/api/v2/tenants/{}/integrations", self.client.tenant_id())
    }

    pub async fn list(&self) -> Result<Value, GatewayError> {
        let value = self.client.get(&format!("{}/installed/search", self.base())).await?;
        Ok(decode_results_tolerant(value))
    }

    pub async fn get(&self, id: &str) -> Result<Value, GatewayError> {
        let value = self.client.get(&format!("{}/installed/{id}", self.base())).await?;
        Ok(decode_singleton_tolerant(value, SINGLETON_WRAPPERS))
    }

    /// Fetches the base integration, then its resources/metrics/alerts as
    /// independent child requests, tolerant of individual failures
    pub async fn get_detailed(&self, id: &str) -> Result<Value, GatewayError> {
        let mut detailed = self.get(id).await?;

        let resources = self.fetch_child_or_empty(id, "resources").await;
        let metrics = self.fetch_child_or_empty(id, "metrics").await;
        let alerts = self.fetch_child_or_empty(id, "alerts").await;

        if let Some(obj) = detailed.as_object_mut() {
            obj.insert("resources".to_string(), resources);
            obj.insert("metrics".to_string(), metrics);
            obj.insert("alerts".to_string(), alerts);
        }
        Ok(detailed)
    }

    async fn fetch_child_or_empty(&self, id: &str, child: &str) -> Value {
        match self.client.get(&format!("{}/installed/{id}/{child}", self.base())).await {
            Ok(value) => decode_results_tolerant(value),
            Err(err) => {
                tracing::debug!(integration_id = id, child, error = %err, "child request failed, tolerating");
                Value::Array(vec![])
            }
        }
    }

    pub async fn create(&self, config: &Value) -> Result<Value, GatewayError> {
        let unique_name = config
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::Upstream(UpstreamError::new(ErrorKind::Validation, "config.name is required")))?;
        self.client.post(&format!("{}/install/{unique_name}", self.base()), Some(config)).await
    }

    pub async fn update(&self, id: &str, config: &Value) -> Result<Value, GatewayError> {
        self.client.post(&format!("{}/installed/{id}", self.base()), Some(config)).await
    }

    pub async fn delete(&self, id: &str) -> Result<Value, GatewayError> {
        self.client.delete(&format!("{}/installed/{id}", self.base())).await
    }

    pub async fn enable(&self, id: &str) -> Result<Value, GatewayError> {
        self.client.post(&format!("{}/installed/{id}/enable", self.base()), None::<&()>).await
    }

    pub async fn disable(&self, id: &str) -> Result<Value, GatewayError> {
        self.client.post(&format!("{}/installed/{id}/disable", self.base()), None::<&()>).await
    }

    /// Projects `{id, name}` pairs across the `type` fields of the
    /// available-integrations catalog.
    pub async fn list_types(&self) -> Result<Value, GatewayError> {
        let value = self.client.get(&format!("{}/available/search", self.base())).await?;
        let entries = decode_results_tolerant(value);
        let mut seen = HashSet::new();
        let mut projected = Vec::new();

        if let Value::Array(items) = entries {
            for item in items {
                let Some(obj) = item.as_object() else { continue };
                let type_obj = obj.get("type").and_then(Value::as_object);
                let (id, name) = match type_obj {
                    Some(t) => (
                        t.get("id").and_then(Value::as_str).map(str::to_string),
                        t.get("name").and_then(Value::as_str).map(str::to_string),
                    ),
                    None => (
                        obj.get("id").and_then(Value::as_str).map(str::to_string),
                        obj.get("name").and_then(Value::as_str).map(str::to_string),
                    ),
                };
                if let (Some(id), Some(name)) = (id, name) {
                    if seen.insert(id.clone()) {
                        projected.push(json!({"id": id, "name": name}));
                    }
                }
            }
        }
        Ok(Value::Array(projected))
    }

    /// No dedicated endpoint exists for a single type; project over the
    /// same catalog `listTypes` uses.
    pub async fn get_type(&self, type_id: &str) -> Result<Value, GatewayError> {
        let types = self.list_types().await?;
        if let Value::Array(items) = types {
            if let Some(found) = items.into_iter().find(|item| item.get("id").and_then(Value::as_str) == Some(type_id)) {
                return Ok(found);
            }
        }
        Err(GatewayError::Upstream(UpstreamError::new(ErrorKind::NotFound, format!("integration type '{type_id}' not found"))))
    }
}

/// MCP `integrations` tool: validates inputs, routes `action` to the
/// adapter, and classifies adapter failures into the `is_error` envelope
pub struct IntegrationsTool {
    adapter: IntegrationsAdapter,
}

impl IntegrationsTool {
    pub fn new(client: Arc<UpstreamClient>) -> Self {
        Self { adapter: IntegrationsAdapter::new(client) }
    }
}

#[async_trait]
impl Tool for IntegrationsTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "integrations".to_string(),
            description: "Manage installed integrations: list, inspect, install, update, enable/disable, and browse available integration types.".to_string(),
            input_schema: base_schema(
                ACTIONS,
                json!({
                    "id": {"type": "string", "description": "Integration id, required for get/update/delete/enable/disable"},
                    "config": {"type": "object", "description": "Integration configuration payload for create/update"}
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
            "list" => self.adapter.list().await,
            "get" => match super::require_str(&arguments, "id", "Integration ID") {
                Ok(id) => self.adapter.get(id).await,
                Err(result) => return result,
            },
            "getDetailed" => match super::require_str(&arguments, "id", "Integration ID") {
                Ok(id) => self.adapter.get_detailed(id).await,
                Err(result) => return result,
            },
            "create" => match super::require_object(&arguments, "config", "Config") {
                Ok(config) => self.adapter.create(&Value::Object(config.clone())).await,
                Err(result) => return result,
            },
            "update" => {
                let id = match super::require_str(&arguments, "id", "Integration ID") {
                    Ok(id) => id.to_string(),
                    Err(result) => return result,
                };
                let config = match super::require_object(&arguments, "config", "Config") {
                    Ok(config) => config.clone(),
                    Err(result) => return result,
                };
                self.adapter.update(&id, &Value::Object(config)).await
            }
            "delete" => match super::require_str(&arguments, "id", "Integration ID") {
                Ok(id) => self.adapter.delete(id).await,
                Err(result) => return result,
            },
            "enable" => match super::require_str(&arguments, "id", "Integration ID") {
                Ok(id) => self.adapter.enable(id).await,
                Err(result) => return result,
            },
            "disable" => match super::require_str(&arguments, "id", "Integration ID") {
                Ok(id) => self.adapter.disable(id).await,
                Err(result) => return result,
            },
            "listTypes" => self.adapter.list_types().await,
            "getType" => match super::require_str(&arguments, "id", "Integration type ID") {
                Ok(id) => self.adapter.get_type(id).await,
                Err(result) => return result,
            },
            other => return ToolResult::error(format!("unknown action '{other}' for tool 'integrations'")),
        };

        result_to_tool_result(action, outcome)
    }
}

fn result_to_tool_result(action: &str, outcome: Result<Value, GatewayError>) -> ToolResult {
    match outcome {
        Ok(value) => {
            crate::telemetry::record_tool_call("integrations", action, false);
            ToolResult::success(&value)
        }
        Err(GatewayError::Upstream(err)) => {
            crate::telemetry::record_tool_call("integrations", action, true);
            ToolResult::from_upstream_error(&err)
        }
        Err(other) => {
            crate::telemetry::record_tool_call("integrations", action, true);
            ToolResult::error(other.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn test_adapter(server: &MockServer) -> IntegrationsAdapter {
        let auth_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "t", "expires_in": 3600})))
            .mount(&auth_server)
            .await;

        let config = crate::config::OpsRampConfig {
            tenant_url: server.uri(),
            auth_url: format!("{}/oauth/token", auth_server.uri()),
            auth_key: "k".into(),
            auth_secret: "s".into(),
            tenant_id: "tenant-1".into(),
            resources: Default::default(),
        };
        let adapter = IntegrationsAdapter::new(Arc::new(UpstreamClient::new(&config).unwrap()));
        // Leak the auth mock server so it outlives this function; the
        // UpstreamClient holds no reference back to it, only the URL.
        std::mem::forget(auth_server);
        adapter
    }

    #[tokio::test]
    async fn list_tolerates_wrapped_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/tenants/tenant-1/integrations/installed/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"id": "I-1", "name": "A", "type": "X", "status": "active"}]
            })))
            .mount(&server)
            .await;

        let adapter = test_adapter(&server).await;
        let result = adapter.list().await.unwrap();
        assert_eq!(result, json!([{"id": "I-1", "name": "A", "type": "X", "status": "active"}]));
    }

    #[tokio::test]
    async fn list_tolerates_bare_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/tenants/tenant-1/integrations/installed/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "I-1", "name": "A", "type": "X", "status": "active"}
            ])))
            .mount(&server)
            .await;

        let adapter = test_adapter(&server).await;
        let result = adapter.list().await.unwrap();
        assert_eq!(result, json!([{"id": "I-1", "name": "A", "type": "X", "status": "active"}]));
    }

    #[tokio::test]
    async fn get_detailed_tolerates_child_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/tenants/tenant-1/integrations/installed/I-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "I-1", "name": "A"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/tenants/tenant-1/integrations/installed/I-1/resources"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": [{"id": "R-1"}]})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/tenants/tenant-1/integrations/installed/I-1/metrics"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/tenants/tenant-1/integrations/installed/I-1/alerts"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let adapter = test_adapter(&server).await;
        let result = adapter.get_detailed("I-1").await.unwrap();
        assert_eq!(result["resources"], json!([{"id": "R-1"}]));
        assert_eq!(result["metrics"], json!([]));
        assert_eq!(result["alerts"], json!([]));
    }

    #[tokio::test]
    async fn list_types_dedupes_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/tenants/tenant-1/integrations/available/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"type": {"id": "T1", "name": "Type One"}},
                    {"type": {"id": "T1", "name": "Type One Dup"}},
                    {"type": {"id": "T2", "name": "Type Two"}}
                ]
            })))
            .mount(&server)
            .await;

        let adapter = test_adapter(&server).await;
        let result = adapter.list_types().await.unwrap();
        assert_eq!(result, json!([{"id": "T1", "name": "Type One"}, {"id": "T2", "name": "Type Two"}]));
    }

    #[tokio::test]
    async fn missing_id_yields_is_error_without_calling_adapter() {
        let tool = IntegrationsTool::new(Arc::new(
            UpstreamClient::new(&crate::config::OpsRampConfig {
                tenant_url: "https://unreachable.invalid".into(),
                auth_url: "https://unreachable.invalid/oauth/token".into(),
                auth_key: "k".into(),
                auth_secret: "s".into(),
                tenant_id: "tenant-1".into(),
                resources: Default::default(),
            })
            .unwrap(),
        ));

        let result = tool.call(json!({"action": "get"})).await;
        assert!(result.is_error);
        assert!(result.content[0].text.contains("Integration ID is required"));
    }
}
