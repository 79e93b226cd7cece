//! opsramp-mcp-gateway - MCP gateway exposing a tenant infrastructure API
//! (integrations and resources) to AI agents over three JSON-RPC transports.
//!
//! # Architecture
//!
//! - `config` loads and validates gateway configuration (file + env overrides).
//! - `auth` acquires and caches OAuth2 client-credentials bearer tokens.
//! - `upstream` is the authenticated HTTP client the tool adapters call through.
//! - `tools` hosts the `integrations` and `resources` tool adapters and handlers.
//! - `session` tracks open streaming sessions and their outbound channels.
//! - `mcp` is the JSON-RPC 2.0 dispatcher shared by every transport.
//! - `http` wires the SSE, hybrid, and direct transports plus the health
//!   surface onto a single axum router.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod mcp;
pub mod session;
pub mod telemetry;
pub mod tools;
pub mod upstream;

pub use error::{GatewayError, Result};

/// Initialize structured logging, writing to stderr with an `EnvFilter`
/// defaulting to `info` for this crate.
pub fn init_logging() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "opsramp_mcp_gateway=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
