// Upstream dataset adapters. Each one issues a single bounded-timeout request
// per call and normalizes the payload; merging happens in `refresh`.

pub mod exchange_rates;
pub mod restcountries;

use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::config::UpstreamConfig;
use crate::error::{Upstream, UpstreamError};

pub use exchange_rates::{ExchangeRateProvider, RateTable};
pub use restcountries::{RawCountry, RawCurrency, RestCountriesProvider};

fn truncate_for_log(mut s: String, max_len: usize) -> String {
    if s.len() > max_len {
        let mut cut = max_len;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
        s.push('…');
    }
    s
}

/// Shared HTTP client for both upstreams; the timeout bounds each call.
pub fn build_http_client(cfg: &UpstreamConfig) -> anyhow::Result<Client> {
    let http = Client::builder()
        .user_agent(concat!("country-cache/", env!("CARGO_PKG_VERSION")))
        .timeout(cfg.timeout)
        .build()?;
    Ok(http)
}

/// GET `url` and decode a JSON body. Network errors, timeouts, non-2xx statuses
/// and undecodable bodies all map to `UpstreamError::Unavailable`.
pub(crate) async fn get_json(
    http: &Client,
    url: &Url,
    upstream: Upstream,
) -> Result<Value, UpstreamError> {
    let resp = http
        .get(url.clone())
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| UpstreamError::unavailable(upstream, e))?;
    let status = resp.status();
    if !status.is_success() {
        let body = truncate_for_log(resp.text().await.unwrap_or_default(), 500);
        return Err(UpstreamError::unavailable(
            upstream,
            format!("HTTP {status} body={body}"),
        ));
    }
    resp.json::<Value>()
        .await
        .map_err(|e| UpstreamError::unavailable(upstream, e))
}

/// Both adapters wired to one client.
#[derive(Debug, Clone)]
pub struct Upstreams {
    pub countries: RestCountriesProvider,
    pub rates: ExchangeRateProvider,
}

impl Upstreams {
    pub fn new(cfg: &UpstreamConfig) -> anyhow::Result<Self> {
        let http = build_http_client(cfg)?;
        Ok(Self {
            countries: RestCountriesProvider::new(http.clone(), cfg.countries_url.clone()),
            rates: ExchangeRateProvider::new(http, cfg.rates_url.clone()),
        })
    }
}
