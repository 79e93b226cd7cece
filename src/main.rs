//! opsramp-mcp-gateway entry point.
//!
//! Run with: cargo run --bin mcp-gateway
//! Config file path defaults to `config.json`; override with `CONFIG_PATH`.

use opsramp_mcp_gateway::config::GatewayConfig;
use opsramp_mcp_gateway::http::{self, AppState};
use opsramp_mcp_gateway::mcp::McpCore;
use opsramp_mcp_gateway::session::SessionManager;
use opsramp_mcp_gateway::tools::integrations::IntegrationsTool;
use opsramp_mcp_gateway::tools::resources::ResourcesTool;
use opsramp_mcp_gateway::tools::ToolRegistry;
use opsramp_mcp_gateway::upstream::UpstreamClient;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::main]
async fn main() {
    opsramp_mcp_gateway::init_logging();

    let config = load_config();

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "gateway exited with error");
        std::process::exit(1);
    }
}

fn load_config() -> GatewayConfig {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.json".to_string());
    match GatewayConfig::load(&path) {
        Ok(config) => config,
        Err(file_err) => GatewayConfig::from_env().unwrap_or_else(|env_err| {
            eprintln!("failed to load config from {path} ({file_err}); failed to load from environment ({env_err})");
            std::process::exit(1);
        }),
    }
}

async fn run(config: GatewayConfig) -> opsramp_mcp_gateway::Result<()> {
    let upstream = Arc::new(UpstreamClient::new(&config.opsramp)?);

    let registry = Arc::new(ToolRegistry::new());
    registry.register(Arc::new(IntegrationsTool::new(upstream.clone())));
    registry.register(Arc::new(ResourcesTool::new(upstream.clone(), config.opsramp.resources.clone())));

    let sessions = SessionManager::new();
    tokio::spawn(sessions.clone().run_idle_reaper());

    let core = Arc::new(McpCore::new(registry, sessions.clone()));

    let state = AppState { core: core.clone(), debug: config.debug, start_time: Instant::now() };
    let router = http::build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(opsramp_mcp_gateway::GatewayError::Io)?;
    tracing::info!(addr = %addr, debug = config.debug, "opsramp-mcp-gateway listening");

    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal(sessions)).await.map_err(opsramp_mcp_gateway::GatewayError::Io)?;

    Ok(())
}

/// Waits for SIGINT/SIGTERM, then cancels every open session and gives
/// their writer tasks up to 10s to drain before the process exits
async fn shutdown_signal(sessions: SessionManager) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, draining sessions");
    sessions.close_all();
    tokio::time::sleep(WRITER_DRAIN_GRACE_PERIOD).await;
}

/// Upper bound on how long shutdown waits for session writer tasks to
/// drain before the process terminates forcefully.
const WRITER_DRAIN_GRACE_PERIOD: Duration = Duration::from_secs(10);
