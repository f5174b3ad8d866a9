use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::database_ops::countries::{
    compare_by_gdp, name_key, Country, CountryDraft, CountryFilter, CountryStore, GdpSort,
};

#[derive(Debug, Default)]
struct MemoryState {
    rows: BTreeMap<String, Country>,
    next_id: i64,
}

/// Process-local store with the same keying and ordering rules as Postgres.
/// Used by `COUNTRY_STORE=memory` and by tests.
#[derive(Debug, Default)]
pub struct MemoryCountryStore {
    state: RwLock<MemoryState>,
}

impl MemoryCountryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CountryStore for MemoryCountryStore {
    async fn upsert(&self, draft: &CountryDraft) -> Result<Country> {
        draft.validate()?;
        let mut state = self.state.write().await;
        let key = draft.key();
        let id = match state.rows.get(&key) {
            Some(existing) => existing.id,
            None => {
                state.next_id += 1;
                state.next_id
            }
        };
        let row = Country {
            id,
            name: draft.name.clone(),
            capital: draft.capital.clone(),
            region: draft.region.clone(),
            population: draft.population,
            currency_code: draft.currency_code.clone(),
            exchange_rate: draft.exchange_rate.clone(),
            estimated_gdp: draft.estimated_gdp.clone(),
            flag_url: draft.flag_url.clone(),
            last_refreshed_at: Utc::now(),
        };
        state.rows.insert(key, row.clone());
        Ok(row)
    }

    async fn get(&self, name: &str) -> Result<Option<Country>> {
        let state = self.state.read().await;
        Ok(state.rows.get(&name_key(name)).cloned())
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(state.rows.remove(&name_key(name)).is_some())
    }

    async fn list(&self, filter: &CountryFilter) -> Result<Vec<Country>> {
        let state = self.state.read().await;
        let mut rows: Vec<Country> = state
            .rows
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        if let Some(sort) = filter.sort {
            rows.sort_by(|a, b| compare_by_gdp(a, b, sort));
        }
        Ok(rows)
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.state.read().await.rows.len() as i64)
    }

    async fn top_by_gdp(&self, limit: usize) -> Result<Vec<Country>> {
        let state = self.state.read().await;
        let mut rows: Vec<Country> = state
            .rows
            .values()
            .filter(|c| c.estimated_gdp.is_some())
            .cloned()
            .collect();
        rows.sort_by(|a, b| compare_by_gdp(a, b, GdpSort::Desc));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn last_refreshed_at(&self) -> Result<Option<DateTime<Utc>>> {
        let state = self.state.read().await;
        Ok(state.rows.values().map(|c| c.last_refreshed_at).max())
    }
}
