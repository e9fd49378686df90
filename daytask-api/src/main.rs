//! # Daytask API Server
//!
//! HTTP server for the Daytask personal task tracker: identity
//! registration, cookie-session authentication, and owner-scoped task CRUD.
//!
//! ## Architecture
//!
//! The server does not connect to the database at startup. The first request
//! triggers a single-flight connection attempt (plus one-time migrations and
//! legacy-schema cleanup) through the shared connection manager, so a
//! temporarily unreachable database yields 503s that heal without a restart.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://... SESSION_SECRET=$(openssl rand -hex 32) \
//!     cargo run -p daytask-api
//! ```

use daytask_api::{
    app::{build_router, AppState},
    config::Config,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "daytask_api=debug,daytask_shared=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Daytask API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    // A missing DATABASE_URL or SESSION_SECRET is fatal here, before any
    // socket is bound.
    let config = Config::from_env()?;
    let bind_address = config.bind_address();
    let production = config.api.production;

    let state = AppState::new(config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!(%bind_address, production, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("Failed to install shutdown signal handler");
        return;
    }
    tracing::info!("Shutdown signal received, exiting...");
}
