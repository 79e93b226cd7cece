use super::*;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn test_client(server: &MockServer) -> UpstreamClient {
    let auth_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "test-token",
            "expires_in": 3600
        })))
        .mount(&auth_server)
        .await;

    let config = OpsRampConfig {
        tenant_url: server.uri(),
        auth_url: format!("{}/oauth/token", auth_server.uri()),
        auth_key: "key".into(),
        auth_secret: "secret".into(),
        tenant_id: "tenant-1".into(),
        resources: crate::config::ResourcesConfig { retry_attempts: 3, retry_delay: 1, ..Default::default() },
    };

    // Leak the auth mock server so it outlives this function; the
    // UpstreamClient holds no reference back to it, only the URL.
    std::mem::forget(auth_server);

    UpstreamClient::new(&config).unwrap()
}

#[tokio::test]
async fn get_attaches_bearer_token_and_tenant_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tenants/tenant-1/integrations/installed/search"))
        .and(header("Authorization", "Bearer test-token"))
        .and(header("X-Tenant-ID", "tenant-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": []})))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let result = client.get("/api/v2/tenants/tenant-1/integrations/installed/search").await.unwrap();
    assert_eq!(result, serde_json::json!({"results": []}));
}

#[tokio::test]
async fn preserves_query_string_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tenants/tenant-1/resources/search"))
        .and(query_param("state", "running"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let result = client.get("/api/v2/tenants/tenant-1/resources/search?state=running").await.unwrap();
    assert_eq!(result, serde_json::json!([]));
}

#[tokio::test]
async fn non_2xx_status_becomes_classified_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tenants/tenant-1/resources/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let err = client.get("/api/v2/tenants/tenant-1/resources/missing").await.unwrap_err();
    match err {
        GatewayError::Upstream(upstream) => assert_eq!(upstream.kind, ErrorKind::NotFound),
        other => panic!("expected Upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn retries_server_errors_then_surfaces_classified_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tenants/tenant-1/resources/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let err = client.get("/api/v2/tenants/tenant-1/resources/flaky").await.unwrap_err();
    match err {
        GatewayError::Upstream(upstream) => assert_eq!(upstream.kind, ErrorKind::ServerError),
        other => panic!("expected Upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn does_not_retry_non_retryable_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tenants/tenant-1/resources/bad-input"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad input"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let err = client.get("/api/v2/tenants/tenant-1/resources/bad-input").await.unwrap_err();
    match err {
        GatewayError::Upstream(upstream) => assert_eq!(upstream.kind, ErrorKind::Validation),
        other => panic!("expected Upstream error, got {other:?}"),
    }
}
