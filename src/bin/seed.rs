use anyhow::Context;
use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;

use forum_api::{config::Config, db, seeder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    let pool = db::connect(&config)
        .await
        .context("Failed to connect to database")?;

    db::run_migrations(&pool).await.context("Failed to run migrations")?;
    seeder::seed_database(&pool).await.context("Seeding failed")?;

    Ok(())
}
