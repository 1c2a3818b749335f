use dotenvy::dotenv;
use eyre::Result;
use tracing::info;

use yield_allocation_advisor::config;
use yield_allocation_advisor::db::{connection, schema};
use yield_allocation_advisor::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the process environment still applies
    dotenv().ok();

    if let Err(e) = logging::init_logging(env!("CARGO_BIN_NAME").to_string()) {
        eprintln!("Failed to initialize logging: {}", e);
        return Err(e);
    }

    let cfg = config::Config::load()?;
    info!("Configuration loaded and logging initialized");

    let pool = connection::create_pool(&cfg).await?;
    info!("Database connection pool created");

    schema::init_schema(&pool).await?;
    info!("Database schema initialized");

    pool.close().await;
    Ok(())
}
