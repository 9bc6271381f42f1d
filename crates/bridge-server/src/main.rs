mod configuration;
mod error;
mod routes;
mod state;
mod workspace;

use bridge::engine::claude_cli::ClaudeCliEngine;
use bridge::mcp::McpResolver;
use bridge::mode_prompt::ModePrompts;
use bridge::orchestrator::Orchestrator;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    let settings = configuration::Settings::new()?;

    let engine = ClaudeCliEngine::new(&settings.engine);
    let orchestrator = Orchestrator::new(
        Arc::new(engine),
        McpResolver::new(settings.mcp.clone()),
        ModePrompts::new(settings.agent.prompts_dir.clone()),
        settings.orchestrator_settings(),
    );
    let state = state::AppState::new(
        orchestrator,
        settings.server.service_name.clone(),
        settings.workspace.root.clone(),
    );

    // Create router with CORS support
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(settings.server.socket_addr()?).await?;
    info!(
        service = %settings.server.service_name,
        engine = %settings.engine.command,
        "listening on {}",
        listener.local_addr()?
    );

    axum::serve(listener, app).await?;
    Ok(())
}
