// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact API Service
//!
//! Serves the contact form endpoints for the studio website.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! - `BIND_ADDR`: Server bind address (default: 127.0.0.1:5000)
//! - `DATABASE_URL`: SQLite URL (default: sqlite://sqlite.db)
//! - `APP_ENV`: `development` enables debug logging (default: production)
//! - `LOG_DIR`: Directory for access.log and error.log (default: logs)
//! - `RATE_LIMIT_MAX`, `RATE_LIMIT_WINDOW_SECS`: submission quota (default: 5 per 900s)
//! - `CSRF_SECRET`: 64 hex chars; random per process when unset
//! - `ADMIN_TOKEN`: bearer token for `GET /api/contact`; listing disabled when unset

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

use contact_api::{config::Config, db::Database, handlers::AppState, logging, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    let _log_guards = logging::init(&config.logging, config.environment)?;
    info!(
        bind_addr = %config.bind_addr,
        environment = ?config.environment,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        "Starting contact API"
    );
    if config.admin_token.is_none() {
        warn!("ADMIN_TOKEN not set; GET /api/contact is disabled");
    }

    let db = Database::connect(&config.database_url).await?;
    info!("Database initialized");

    let state = Arc::new(AppState::new(config.clone(), db)?);

    // Spawn cleanup task
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            cleanup_state.limiter.cleanup().await;
        }
    });

    let app = routes::router(state.clone());

    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    state.db.close().await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
