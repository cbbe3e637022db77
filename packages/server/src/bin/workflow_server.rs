//! Restate Workflow Server
//!
//! This binary runs the Restate endpoint that hosts the durable video-edit
//! workflow. The Restate engine dispatches journal entries here; the HTTP
//! API process submits workflows through the engine's ingress.

use std::sync::Arc;

use anyhow::{Context, Result};
use restate_sdk::prelude::*;
use server_core::domains::orchestration::{VideoEditWorkflow, VideoEditWorkflowImpl};
use server_core::kernel::ServerDeps;
use server_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,restate_sdk=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting Restate Workflow Server");

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    let deps = Arc::new(ServerDeps::from_config(pool, config)?);

    // Get port from environment or use default
    let port = std::env::var("WORKFLOW_SERVER_PORT")
        .unwrap_or_else(|_| "9080".to_string())
        .parse::<u16>()
        .context("Invalid WORKFLOW_SERVER_PORT")?;

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("Workflow server listening on {addr}");

    // Build Restate endpoint with the video-edit workflow
    let mut builder = Endpoint::builder();

    // Configure Restate request identity verification
    if let Ok(identity_key) = std::env::var("RESTATE_IDENTITY_KEY") {
        tracing::info!("Restate identity key configured");
        builder = builder
            .identity_key(&identity_key)
            .context("Invalid Restate identity key")?;
    }

    let endpoint = builder
        .bind(VideoEditWorkflowImpl::with_deps(deps).serve())
        .build();

    HttpServer::new(endpoint)
        .listen_and_serve(addr.parse()?)
        .await;

    Ok(())
}
