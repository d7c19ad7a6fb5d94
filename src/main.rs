use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use forum_api::{config::Config, create_router, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Arc::new(Config::from_env().context("Failed to load configuration")?);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let db_pool = db::connect(&config)
        .await
        .context("Failed to create database pool")?;
    info!("Database connection pool established");

    db::run_migrations(&db_pool)
        .await
        .context("Failed to run migrations")?;
    info!("Database migrations completed");

    // Build the router and start serving
    let addr = config.bind_addr;
    let app = create_router(db_pool, config);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
