//! Server initialization and run loop

use super::config::AppConfig;
use super::shutdown::wait_for_shutdown_signal;
use crate::api::{api_router, ApiState};
use crate::middleware::CorsLayer;
use agentpty_core::{AgentClient, CliAgent, PromptOptions};
use agentpty_term::SessionRegistry;
use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Assemble the HTTP application around `agent`.
pub fn build_app(config: &AppConfig, agent: Arc<dyn AgentClient>) -> Router {
    let defaults = PromptOptions {
        model: config.agent.model.clone(),
        path: config.agent.cwd.clone(),
    };

    api_router(ApiState::new(agent, defaults))
        .layer(CorsLayer::new(config.server.cors))
        .layer(TraceLayer::new_for_http())
}

/// Serve the API until a shutdown signal arrives.
pub async fn run(config: AppConfig) -> Result<()> {
    let command = config.agent_command();
    info!(
        program = %command.program,
        model = ?config.agent.model,
        cwd = ?config.agent.cwd,
        cors = config.server.cors,
        "Configuring agent API"
    );
    let app = build_app(&config, Arc::new(CliAgent::new(command.clone())));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    let url = format!("http://{}", listener.local_addr().unwrap_or(addr));
    info!("{} API server running at {}", command.program, url);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .context("HTTP server error")?;

    let terminated = SessionRegistry::global().terminate_all();
    if terminated > 0 {
        warn!(count = terminated, "Terminated live terminal sessions");
    }
    info!("agentpty shutdown complete");
    Ok(())
}
