use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use bigdecimal::{BigDecimal, Zero};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::database_ops::countries::{CountryDraft, CountryStore};
use crate::error::UpstreamError;
use crate::providers::{RateTable, RawCountry, Upstreams};
use crate::refresh::gdp::{estimate_gdp, MultiplierSource};
use crate::refresh::summary::SummaryBuilder;

/// Decimal places kept for exchange rates (matches the NUMERIC(18,6) column).
pub const RATE_SCALE: i64 = 6;

/// Why a raw upstream record produced no write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Malformed(String),
    MissingName,
    MissingPopulation,
    NegativePopulation(i64),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Malformed(e) => write!(f, "malformed record: {e}"),
            SkipReason::MissingName => f.write_str("missing name"),
            SkipReason::MissingPopulation => f.write_str("missing population"),
            SkipReason::NegativePopulation(p) => write!(f, "negative population {p}"),
        }
    }
}

/// Pure per-record transition: raw upstream JSON + rate table -> draft to upsert.
///
/// - no currency at all: `exchange_rate = None`, `estimated_gdp = 0`
/// - currency with a known rate: rate copied, GDP estimated
/// - currency without a known rate: both `None`
pub fn reconcile_record(
    raw: &Value,
    rates: &RateTable,
    multiplier: &dyn MultiplierSource,
) -> Result<CountryDraft, SkipReason> {
    let country = RawCountry::from_value(raw).map_err(|e| SkipReason::Malformed(e.to_string()))?;

    let name = country
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or(SkipReason::MissingName)?
        .to_string();
    let population = country.population.ok_or(SkipReason::MissingPopulation)?;
    if population < 0 {
        return Err(SkipReason::NegativePopulation(population));
    }

    let currency_code = country.first_currency_code().map(str::to_string);
    let (exchange_rate, estimated_gdp) = match currency_code.as_deref() {
        None => (None, Some(BigDecimal::zero())),
        Some(code) => match rates.get(code) {
            Some(rate) => {
                let rate = rate.round(RATE_SCALE);
                let gdp = estimate_gdp(population, Some(&rate), multiplier);
                (Some(rate), gdp)
            }
            None => (None, None),
        },
    };

    Ok(CountryDraft {
        name,
        capital: country.capital,
        region: country.region,
        population,
        currency_code,
        exchange_rate,
        estimated_gdp,
        flag_url: country.flag,
    })
}

/// Per-batch counters folded over the upstream records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshTally {
    pub upserted: usize,
    pub skipped: usize,
}

/// Reconcile and upsert every record in source order. A record that fails for
/// any reason is logged and counted; it never stops the batch.
pub async fn apply_batch(
    store: &dyn CountryStore,
    records: &[Value],
    rates: &RateTable,
    multiplier: &dyn MultiplierSource,
) -> RefreshTally {
    let mut tally = RefreshTally::default();
    for (index, raw) in records.iter().enumerate() {
        let draft = match reconcile_record(raw, rates, multiplier) {
            Ok(draft) => draft,
            Err(reason) => {
                warn!(index, %reason, "skipping country record");
                tally.skipped += 1;
                continue;
            }
        };
        match store.upsert(&draft).await {
            Ok(_) => tally.upserted += 1,
            Err(e) => {
                warn!(index, name = %draft.name, error = %format!("{e:#}"), "country upsert failed; skipping");
                tally.skipped += 1;
            }
        }
    }
    tally
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshOutcome {
    pub total_countries: i64,
    pub tally: RefreshTally,
    /// `None` when the summary artifact could not be written.
    pub summary_path: Option<PathBuf>,
}

/// Fetch both upstreams, reconcile into the store, then republish the summary.
#[derive(Clone)]
pub struct RefreshEngine {
    upstreams: Upstreams,
    store: Arc<dyn CountryStore>,
    multiplier: Arc<dyn MultiplierSource>,
    summary: SummaryBuilder,
}

impl RefreshEngine {
    pub fn new(
        upstreams: Upstreams,
        store: Arc<dyn CountryStore>,
        multiplier: Arc<dyn MultiplierSource>,
        summary: SummaryBuilder,
    ) -> Self {
        Self {
            upstreams,
            store,
            multiplier,
            summary,
        }
    }

    pub fn summary(&self) -> &SummaryBuilder {
        &self.summary
    }

    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<RefreshOutcome, RefreshError> {
        let (countries, rates) = tokio::join!(
            self.upstreams.countries.fetch_countries(),
            self.upstreams.rates.fetch_rates()
        );
        // Nothing is written unless both datasets arrived.
        let countries = countries?;
        let rates = rates?;
        info!(
            countries = countries.len(),
            rates = rates.len(),
            "upstream datasets fetched"
        );

        let tally = apply_batch(
            self.store.as_ref(),
            &countries,
            &rates,
            self.multiplier.as_ref(),
        )
        .await;

        let input = self.summary.collect().await?;
        let summary_path = match self.summary.publish(&input).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "summary artifact not updated");
                None
            }
        };

        info!(
            total = input.total_countries,
            upserted = tally.upserted,
            skipped = tally.skipped,
            "refresh complete"
        );
        Ok(RefreshOutcome {
            total_countries: input.total_countries,
            tally,
            summary_path,
        })
    }
}
