// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bloggy API Server
//!
//! Blog backend with Google login, revocable access tokens and likes on
//! posts and comments.

use bloggy::{
    config::Config,
    db::{FirestoreDb, Stores},
    services::{GoogleProvider, MemorySessionStore},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Bloggy API");

    let db = FirestoreDb::new(&config.gcp_project_id).await?;
    let stores = Stores::from_backend(db);

    let provider = Arc::new(GoogleProvider::new(&config)?);
    let sessions = Arc::new(MemorySessionStore::new());

    let state = Arc::new(AppState::new(config.clone(), stores, provider, sessions));

    // Expired tokens left over from earlier runs
    if let Err(e) = state.tokens.init_token_expiry_index().await {
        tracing::warn!(error = %e, "Failed to initialize token expiry, continuing anyway");
    }

    let app = bloggy::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bloggy=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
