pub mod countries;
pub mod db;
pub mod memory_store;
pub mod pg_store;

pub use countries::{Country, CountryDraft, CountryFilter, CountryStore, GdpSort};
pub use memory_store::MemoryCountryStore;
pub use pg_store::PgCountryStore;

use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use crate::config::{AppConfig, StoreBackend};
use crate::util::env as env_util;

/// Build the configured store backend.
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn CountryStore>> {
    match config.store {
        StoreBackend::Memory => {
            warn!("COUNTRY_STORE=memory; records are lost when the process exits");
            Ok(Arc::new(MemoryCountryStore::new()))
        }
        StoreBackend::Postgres => {
            let database_url = env_util::db_url()?;
            let db =
                db::Db::connect(&database_url, config.db_max_connections, config.auto_migrate)
                    .await?;
            Ok(Arc::new(PgCountryStore::new(db)))
        }
    }
}
