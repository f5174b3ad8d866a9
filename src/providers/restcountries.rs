use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{Upstream, UpstreamError};

/// Country metadata source (restcountries v2 `all` endpoint).
///
/// Expected payload: an array of
/// `{name, capital, region, population, flag, currencies: [{code, ...}]}`.
/// Records are returned as raw JSON so one malformed entry can be skipped
/// without rejecting the whole batch.
#[derive(Debug, Clone)]
pub struct RestCountriesProvider {
    url: Url,
    http: Client,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawCurrency {
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawCountry {
    pub name: Option<String>,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: Option<i64>,
    pub flag: Option<String>,
    #[serde(default)]
    pub currencies: Option<Vec<RawCurrency>>,
}

impl RawCountry {
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        RawCountry::deserialize(value)
    }

    /// Code of the first listed currency; blank codes count as absent.
    pub fn first_currency_code(&self) -> Option<&str> {
        self.currencies
            .as_deref()?
            .first()?
            .code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

impl RestCountriesProvider {
    pub fn new(http: Client, url: Url) -> Self {
        Self { url, http }
    }

    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn fetch_countries(&self) -> Result<Vec<Value>, UpstreamError> {
        let body = super::get_json(&self.http, &self.url, Upstream::Countries).await?;
        match body {
            Value::Array(items) => {
                debug!(count = items.len(), "fetched country records");
                Ok(items)
            }
            other => Err(UpstreamError::unavailable(
                Upstream::Countries,
                format!("expected a JSON array, got {}", json_kind(&other)),
            )),
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
