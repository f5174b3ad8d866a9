// Runtime configuration assembled from environment variables

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use url::Url;

use crate::util::env as env_util;

pub const DEFAULT_COUNTRIES_URL: &str =
    "https://restcountries.com/v2/all?fields=name,capital,region,population,flag,currencies";
pub const DEFAULT_RATES_URL: &str = "https://open.er-api.com/v6/latest/USD";
pub const DEFAULT_FONT_PATH: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";
pub const DEFAULT_FONT_BOLD_PATH: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: String,
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub countries_url: Url,
    pub rates_url: Url,
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            countries_url: Url::parse(DEFAULT_COUNTRIES_URL).expect("static countries url"),
            rates_url: Url::parse(DEFAULT_RATES_URL).expect("static rates url"),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SummaryConfig {
    pub cache_dir: PathBuf,
    pub font_path: PathBuf,
    pub font_bold_path: PathBuf,
}

/// Which store backend the binaries wire up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StoreBackend::Postgres),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => bail!("unknown COUNTRY_STORE backend '{other}' (expected postgres|memory)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub summary: SummaryConfig,
    pub store: StoreBackend,
    pub db_max_connections: u32,
    pub auto_migrate: bool,
}

impl AppConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        env_util::init_env();

        let host = env_util::env_opt("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = env_util::env_opt("API_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .trim()
            .parse()
            .context("Invalid API_PORT")?;
        let allowed_origins = env_util::env_opt("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000,http://localhost:8000".to_string());

        let countries_url = parse_url("COUNTRIES_API_URL", DEFAULT_COUNTRIES_URL)?;
        let rates_url = parse_url("RATES_API_URL", DEFAULT_RATES_URL)?;
        let timeout_secs: u64 = env_util::env_parse("UPSTREAM_TIMEOUT_SECS", 10u64);
        if timeout_secs == 0 {
            bail!("UPSTREAM_TIMEOUT_SECS must be greater than zero");
        }

        let cache_dir = env_util::env_opt("CACHE_DIR").unwrap_or_else(|| "./cache".to_string());
        let font_path =
            env_util::env_opt("SUMMARY_FONT_PATH").unwrap_or_else(|| DEFAULT_FONT_PATH.to_string());
        let font_bold_path = env_util::env_opt("SUMMARY_FONT_BOLD_PATH")
            .unwrap_or_else(|| DEFAULT_FONT_BOLD_PATH.to_string());

        let store = env_util::env_opt("COUNTRY_STORE")
            .map(|raw| raw.parse::<StoreBackend>())
            .transpose()?
            .unwrap_or(StoreBackend::Postgres);

        Ok(Self {
            server: ServerConfig {
                host,
                port,
                allowed_origins,
            },
            upstream: UpstreamConfig {
                countries_url,
                rates_url,
                timeout: Duration::from_secs(timeout_secs),
            },
            summary: SummaryConfig {
                cache_dir: PathBuf::from(cache_dir),
                font_path: PathBuf::from(font_path),
                font_bold_path: PathBuf::from(font_bold_path),
            },
            store,
            db_max_connections: env_util::env_parse("DB_MAX_CONNS", 10u32),
            auto_migrate: env_util::env_flag("AUTO_MIGRATE", false),
        })
    }
}

fn parse_url(key: &str, default: &str) -> Result<Url> {
    let raw = env_util::env_opt(key).unwrap_or_else(|| default.to_string());
    let url = Url::parse(raw.trim()).with_context(|| format!("Invalid {key}: {raw}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("{key} must be an http(s) URL, got {}", url.scheme());
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_backend_parses_aliases() {
        assert_eq!("Postgres".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert_eq!(" mem ".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("redis".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn default_upstreams_point_at_public_sources() {
        let cfg = UpstreamConfig::default();
        assert_eq!(cfg.countries_url.host_str(), Some("restcountries.com"));
        assert_eq!(cfg.rates_url.path(), "/v6/latest/USD");
        assert_eq!(cfg.timeout, Duration::from_secs(10));
    }

    #[test]
    fn parse_url_rejects_non_http_schemes() {
        std::env::set_var("COUNTRY_CACHE_TEST_URL", "ftp://example.com/rates");
        assert!(parse_url("COUNTRY_CACHE_TEST_URL", DEFAULT_RATES_URL).is_err());
        std::env::remove_var("COUNTRY_CACHE_TEST_URL");
        let url = parse_url("COUNTRY_CACHE_TEST_URL", DEFAULT_RATES_URL).unwrap();
        assert_eq!(url.as_str(), DEFAULT_RATES_URL);
    }
}
