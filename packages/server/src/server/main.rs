// Main entry point for the API server

use std::sync::Arc;

use anyhow::{Context, Result};
use server_core::domains::catalog;
use server_core::domains::jobs::repository::seed_model_bundles;
use server_core::kernel::ServerDeps;
use server_core::{server::build_app, Config};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Video Edit Orchestration API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(app_env = %config.app_env, "Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    // Seed the model-bundle catalog
    seed_model_bundles(&pool, &catalog::seed_rows())
        .await
        .context("Failed to seed model bundles")?;

    // Build application
    let port = config.api_port;
    let deps = Arc::new(ServerDeps::from_config(pool, config)?);
    let app = build_app(deps);

    // Start server
    let addr = format!("0.0.0.0:{port}");
    tracing::info!("Starting server on {addr}");
    tracing::info!("Health check: http://localhost:{port}/health");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
