use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use bigdecimal::num_bigint::Sign;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::database_ops::countries::{Country, CountryStore};

/// How many ranked countries the summary shows.
pub const TOP_N: usize = 5;
pub const SUMMARY_FILE: &str = "summary.png";

/// The fixed input tuple handed to a renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryInput {
    pub total_countries: i64,
    pub top: Vec<Country>,
    pub last_refreshed_at: Option<DateTime<Utc>>,
}

/// Text content of the summary, in drawing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryText {
    pub title: String,
    pub total: String,
    pub heading: String,
    pub ranked: Vec<String>,
    pub refreshed: String,
}

impl SummaryInput {
    pub fn text(&self) -> SummaryText {
        let ranked = self
            .top
            .iter()
            .take(TOP_N)
            .enumerate()
            .map(|(i, c)| {
                let gdp = c
                    .estimated_gdp
                    .as_ref()
                    .map(format_gdp)
                    .unwrap_or_else(|| "N/A".to_string());
                format!("{}. {}: ${}", i + 1, c.name, gdp)
            })
            .collect();
        SummaryText {
            title: "Country Data Summary".to_string(),
            total: format!("Total Countries: {}", self.total_countries),
            heading: format!("Top {TOP_N} Countries by Estimated GDP:"),
            ranked,
            refreshed: format!("Last Refreshed: {}", format_timestamp(self.last_refreshed_at)),
        }
    }
}

/// `1234567.891` -> `1,234,567.89`
pub fn format_gdp(value: &BigDecimal) -> String {
    let cents = value.round(2).with_scale(2);
    let (digits, _) = cents.as_bigint_and_exponent();
    let mut raw = digits.magnitude().to_string();
    while raw.len() < 3 {
        raw.insert(0, '0');
    }
    let (int_part, frac) = raw.split_at(raw.len() - 2);

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if digits.sign() == Sign::Minus { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}

pub fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

/// Turns a summary into encoded image bytes.
pub trait SummaryRenderer: Send + Sync {
    fn render(&self, input: &SummaryInput) -> Result<Vec<u8>>;
}

/// Single-slot artifact cache: every `store` replaces the previous artifact.
/// There is no versioning and no locking between writers.
#[derive(Debug, Clone)]
pub struct ArtifactSlot {
    dir: PathBuf,
}

impl ArtifactSlot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(SUMMARY_FILE)
    }

    /// Overwrite the slot. Bytes go to a sibling temp file first and are renamed
    /// into place, so readers see either the old or the new artifact.
    pub async fn store(&self, bytes: &[u8]) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating cache dir {}", self.dir.display()))?;
        let target = self.path();
        let tmp = self.dir.join(format!(".{SUMMARY_FILE}.tmp"));
        tokio::fs::write(&tmp, bytes)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &target)
            .await
            .with_context(|| format!("replacing {}", target.display()))?;
        Ok(target)
    }

    /// `None` when no artifact has been generated yet.
    pub async fn load(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path()).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", self.path().display())),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Gathers aggregate stats from the store and publishes the rendered artifact.
#[derive(Clone)]
pub struct SummaryBuilder {
    store: Arc<dyn CountryStore>,
    renderer: Arc<dyn SummaryRenderer>,
    slot: ArtifactSlot,
}

impl SummaryBuilder {
    pub fn new(
        store: Arc<dyn CountryStore>,
        renderer: Arc<dyn SummaryRenderer>,
        slot: ArtifactSlot,
    ) -> Self {
        Self {
            store,
            renderer,
            slot,
        }
    }

    pub fn slot(&self) -> &ArtifactSlot {
        &self.slot
    }

    pub async fn collect(&self) -> Result<SummaryInput> {
        let total_countries = self.store.count().await?;
        let top = self.store.top_by_gdp(TOP_N).await?;
        let last_refreshed_at = self.store.last_refreshed_at().await?;
        debug!(total_countries, top = top.len(), "summary stats collected");
        Ok(SummaryInput {
            total_countries,
            top,
            last_refreshed_at,
        })
    }

    #[instrument(skip_all, fields(total = input.total_countries))]
    pub async fn publish(&self, input: &SummaryInput) -> Result<PathBuf> {
        let renderer = Arc::clone(&self.renderer);
        let owned = input.clone();
        let bytes = tokio::task::spawn_blocking(move || renderer.render(&owned))
            .await
            .context("summary renderer panicked")??;
        let path = self.slot.store(&bytes).await?;
        info!(path = %path.display(), bytes = bytes.len(), "summary artifact written");
        Ok(path)
    }
}
