//! CLI for applying schema migrations and seeding the bundle catalog
//! without starting the API server.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use server_core::domains::catalog;
use server_core::domains::jobs::repository::seed_model_bundles;
use server_core::Config;
use sqlx::postgres::PgPoolOptions;

#[derive(Parser)]
#[command(name = "migrate_cli")]
#[command(about = "Schema migration and seed runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending migrations
    Run,

    /// Seed the model-bundle catalog
    Seed,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    match cli.command {
        Commands::Run => {
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run migrations")?;
            tracing::info!("Migrations complete");
        }
        Commands::Seed => {
            seed_model_bundles(&pool, &catalog::seed_rows())
                .await
                .context("Failed to seed model bundles")?;
            tracing::info!("Model bundle catalog seeded");
        }
    }

    Ok(())
}
