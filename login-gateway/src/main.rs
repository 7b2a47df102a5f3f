//! login-gateway server

use acton_reactive::prelude::*;
use anyhow::{Context, Result};
use std::time::Duration;

use login_gateway::{
    agents, config::GatewayConfig, observability, oauth2::agent as oauth2_agent, routes,
    state::AppState,
};

/// How often expired sessions and state tokens are dropped
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    observability::init()?;

    let config = GatewayConfig::load().context("loading configuration")?;
    config.validate()?;

    let mut runtime = ActonApp::launch();
    let state = AppState::new(&mut runtime, config).await?;

    let cleanup = tokio::spawn(cleanup_loop(state.clone()));

    let addr = format!("{}:{}", state.config().server.host, state.config().server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    tracing::info!(
        %addr,
        public_url = %state.config().server.public_url,
        "Starting server"
    );

    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cleanup.abort();
    runtime.shutdown_all().await?;
    tracing::info!("Server stopped");

    Ok(())
}

async fn cleanup_loop(state: AppState) {
    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        state.session_manager().send(agents::CleanupExpired).await;
        state.oauth2_manager().send(oauth2_agent::CleanupExpired).await;
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
