// Country record model and the store seam shared by every backend

use std::cmp::Ordering;

use anyhow::Result;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A cached country row as exposed by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Country {
    pub id: i64,
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: i64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<BigDecimal>,
    pub estimated_gdp: Option<BigDecimal>,
    pub flag_url: Option<String>,
    pub last_refreshed_at: DateTime<Utc>,
}

/// Everything a write supplies; identity and timestamp are store-assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryDraft {
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: i64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<BigDecimal>,
    pub estimated_gdp: Option<BigDecimal>,
    pub flag_url: Option<String>,
}

impl CountryDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut err = ValidationError::default();
        if self.name.trim().is_empty() {
            err.push("name", "is required");
        }
        if self.population < 0 {
            err.push("population", "is required");
        }
        if err.is_empty() {
            Ok(())
        } else {
            Err(err)
        }
    }

    /// Normalized identity used for case-insensitive uniqueness.
    pub fn key(&self) -> String {
        name_key(&self.name)
    }
}

/// Lower-cased shadow key for a display name.
pub fn name_key(name: &str) -> String {
    name.to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GdpSort {
    Asc,
    Desc,
}

impl GdpSort {
    /// Unrecognized values return `None` so callers keep the default order.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "gdp_asc" => Some(GdpSort::Asc),
            "gdp_desc" => Some(GdpSort::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CountryFilter {
    pub region: Option<String>,
    pub currency: Option<String>,
    pub sort: Option<GdpSort>,
}

impl CountryFilter {
    pub fn matches(&self, country: &Country) -> bool {
        fn eq_ci(wanted: &Option<String>, actual: &Option<String>) -> bool {
            match wanted {
                None => true,
                Some(w) => actual
                    .as_deref()
                    .is_some_and(|a| a.to_lowercase() == w.to_lowercase()),
            }
        }
        eq_ci(&self.region, &country.region) && eq_ci(&self.currency, &country.currency_code)
    }
}

/// Ordering for GDP sorts: nulls always last, ties broken by name key.
pub fn compare_by_gdp(a: &Country, b: &Country, sort: GdpSort) -> Ordering {
    let by_gdp = match (&a.estimated_gdp, &b.estimated_gdp) {
        (Some(x), Some(y)) => match sort {
            GdpSort::Asc => x.cmp(y),
            GdpSort::Desc => y.cmp(x),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_gdp.then_with(|| name_key(&a.name).cmp(&name_key(&b.name)))
}

/// Persistent record store. Upserts are keyed by [`name_key`].
#[async_trait]
pub trait CountryStore: Send + Sync {
    /// Create the record or update every field of the existing one with the same key.
    async fn upsert(&self, draft: &CountryDraft) -> Result<Country>;

    async fn get(&self, name: &str) -> Result<Option<Country>>;

    /// Returns `false` when nothing matched.
    async fn delete(&self, name: &str) -> Result<bool>;

    async fn list(&self, filter: &CountryFilter) -> Result<Vec<Country>>;

    async fn count(&self) -> Result<i64>;

    /// Highest estimated GDP first; records without an estimate are excluded.
    async fn top_by_gdp(&self, limit: usize) -> Result<Vec<Country>>;

    /// Most recent per-record touch time, `None` when empty.
    async fn last_refreshed_at(&self) -> Result<Option<DateTime<Utc>>>;

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
