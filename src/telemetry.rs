//! Telemetry: Prometheus metrics for the gateway's own operation
//! (HTTP surface, tool invocations, upstream calls, sessions).

use crate::error::{GatewayError, Result};
use once_cell::sync::Lazy;
use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, TextEncoder, register_counter_vec,
    register_gauge, register_histogram_vec,
};

static HTTP_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mcp_gateway_http_requests_total",
        "Total number of HTTP requests received",
        &["handler", "method", "code"]
    )
    .unwrap()
});

static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        HistogramOpts::new("mcp_gateway_http_request_duration_seconds", "Duration of HTTP requests in seconds"),
        &["handler", "method"]
    )
    .unwrap()
});

static TOOL_CALLS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mcp_gateway_tool_calls_total",
        "Total number of tools/call invocations",
        &["tool", "action", "outcome"]
    )
    .unwrap()
});

static UPSTREAM_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mcp_gateway_upstream_requests_total",
        "Total number of upstream API requests",
        &["method", "outcome"]
    )
    .unwrap()
});

static UPSTREAM_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        HistogramOpts::new("mcp_gateway_upstream_request_duration_seconds", "Duration of upstream API requests"),
        &["method"]
    )
    .unwrap()
});

static AUTH_TOKEN_REFRESHES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!("mcp_gateway_auth_token_refreshes_total", "Total number of OAuth2 token refreshes", &["outcome"])
        .unwrap()
});

static OPEN_SESSIONS: Lazy<Gauge> =
    Lazy::new(|| register_gauge!("mcp_gateway_open_sessions", "Number of currently open MCP sessions").unwrap());

/// Initialize telemetry. Prometheus metrics are self-registering via
/// `once_cell`; this just confirms the process is up for the log line.
pub fn init(service_name: &str) -> Result<()> {
    tracing::info!(service = service_name, "telemetry initialized");
    Ok(())
}

pub fn record_http_request(handler: &str, method: &str, status_code: u16) {
    HTTP_REQUESTS_TOTAL.with_label_values(&[handler, method, &status_code.to_string()]).inc();
}

pub fn record_http_duration(handler: &str, method: &str, duration_secs: f64) {
    HTTP_REQUEST_DURATION.with_label_values(&[handler, method]).observe(duration_secs);
}

pub fn record_tool_call(tool: &str, action: &str, is_error: bool) {
    let outcome = if is_error { "error" } else { "success" };
    TOOL_CALLS_TOTAL.with_label_values(&[tool, action, outcome]).inc();
}

pub fn record_upstream_request(method: &str, outcome: &str, duration_secs: f64) {
    UPSTREAM_REQUESTS_TOTAL.with_label_values(&[method, outcome]).inc();
    UPSTREAM_REQUEST_DURATION.with_label_values(&[method]).observe(duration_secs);
}

pub fn record_auth_refresh(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    AUTH_TOKEN_REFRESHES_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn session_opened() {
    OPEN_SESSIONS.inc();
}

pub fn session_closed() {
    OPEN_SESSIONS.dec();
}

/// Prometheus text exposition of every registered metric.
pub fn get_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| GatewayError::internal(format!("failed to encode metrics: {e}")))?;
    String::from_utf8(buffer).map_err(|e| GatewayError::internal(format!("metrics are not valid UTF-8: {e}")))
}

/// Timer helper for HTTP handlers: start on entry, `finish` once the
/// response status is known.
pub struct MetricsMiddleware {
    handler_name: String,
}

impl MetricsMiddleware {
    pub fn new(handler_name: impl Into<String>) -> Self {
        Self { handler_name: handler_name.into() }
    }

    pub fn start(&self) -> std::time::Instant {
        std::time::Instant::now()
    }

    pub fn finish(&self, start: std::time::Instant, method: &str, status_code: u16) {
        let duration = start.elapsed();
        record_http_request(&self.handler_name, method, status_code);
        record_http_duration(&self.handler_name, method, duration.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_exposes_metrics() {
        record_http_request("test_handler", "GET", 200);
        record_http_duration("test_handler", "GET", 0.123);
        record_tool_call("integrations", "list", false);
        record_upstream_request("GET", "success", 0.05);
        record_auth_refresh(true);

        let metrics = get_metrics().unwrap();
        assert!(metrics.contains("mcp_gateway_http_requests_total"));
        assert!(metrics.contains("mcp_gateway_tool_calls_total"));
        assert!(metrics.contains("mcp_gateway_upstream_requests_total"));
        assert!(metrics.contains("mcp_gateway_auth_token_refreshes_total"));
    }

    #[test]
    fn middleware_records_duration() {
        let middleware = MetricsMiddleware::new("test_endpoint");
        let start = middleware.start();
        std::thread::sleep(std::time::Duration::from_millis(5));
        middleware.finish(start, "POST", 201);

        let metrics = get_metrics().unwrap();
        assert!(metrics.contains("mcp_gateway_http_requests_total"));
    }

    #[test]
    fn session_gauge_tracks_open_count() {
        session_opened();
        session_opened();
        session_closed();
        let metrics = get_metrics().unwrap();
        assert!(metrics.contains("mcp_gateway_open_sessions"));
    }
}
