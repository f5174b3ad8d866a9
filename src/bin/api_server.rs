// HTTP API server binary for country-cache

use anyhow::Result;
use country_cache::api::{ApiServer, AppState};
use country_cache::config::AppConfig;
use country_cache::database_ops::open_store;
use country_cache::telemetry;
use country_cache::util::env as env_util;

#[actix_web::main]
async fn main() -> Result<()> {
    // Load dotenv/env once (safe to call multiple times)
    env_util::init_env();
    telemetry::init_tracing(telemetry::DEFAULT_FILTER)?;

    tracing::info!("Initializing country-cache API server");

    let config = AppConfig::from_env()?;
    let store = open_store(&config).await?;
    tracing::info!(backend = ?config.store, "store ready");

    let state = AppState::from_config(&config, store)?;
    ApiServer::from_config(&config.server).run(state).await?;

    Ok(())
}
