use std::collections::HashMap;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::{Upstream, UpstreamError};

/// Currency code → units of that currency per 1 USD.
pub type RateTable = HashMap<String, BigDecimal>;

/// USD-based latest rates (open.er-api.com `/v6/latest/USD`).
/// Payload: `{"result": "success", "base_code": "USD", "rates": {"EUR": 0.92, ...}}`.
#[derive(Debug, Clone)]
pub struct ExchangeRateProvider {
    url: Url,
    http: Client,
}

impl ExchangeRateProvider {
    pub fn new(http: Client, url: Url) -> Self {
        Self { url, http }
    }

    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn fetch_rates(&self) -> Result<RateTable, UpstreamError> {
        let body = super::get_json(&self.http, &self.url, Upstream::Rates).await?;
        let rates = parse_rates(&body);
        debug!(count = rates.len(), "fetched exchange rates");
        Ok(rates)
    }
}

/// Missing or non-object `rates` yields an empty table. Values are read from the
/// JSON number text so no binary float rounding leaks into the decimals.
pub fn parse_rates(body: &Value) -> RateTable {
    let Some(obj) = body.get("rates").and_then(|r| r.as_object()) else {
        warn!("rates payload has no 'rates' object; treating as empty");
        return RateTable::new();
    };
    obj.iter()
        .filter_map(|(code, val)| {
            let number = val.as_number()?;
            match BigDecimal::from_str(&number.to_string()) {
                Ok(rate) => Some((code.clone(), rate)),
                Err(e) => {
                    warn!(code = %code, error = %e, "unparseable rate dropped");
                    None
                }
            }
        })
        .collect()
}
