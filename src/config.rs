use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::services::holder_activity::ScanSettings;

pub const DEFAULT_LEDGER_API_BASE_URL: &str = "https://api.sim.dune.com/v1";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ledger_api_base_url: String,
    pub ledger_api_key: Option<String>,
    pub ledger_timeout: Duration,
    pub token_info_cache_ttl: Duration,
    pub scan: ScanSettings,
    pub bind_addr: String,
}

impl AppConfig {
    /// Read configuration from the environment (call `dotenvy::dotenv()` first)
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let defaults = ScanSettings::default();

        Ok(Self {
            ledger_api_base_url: get("LEDGER_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LEDGER_API_BASE_URL.to_string()),
            ledger_api_key: get("LEDGER_API_KEY"),
            ledger_timeout: Duration::from_secs(parse_or("LEDGER_TIMEOUT_SECS", get("LEDGER_TIMEOUT_SECS"), 30)?),
            token_info_cache_ttl: Duration::from_secs(parse_or(
                "TOKEN_INFO_CACHE_TTL_SECS",
                get("TOKEN_INFO_CACHE_TTL_SECS"),
                3600,
            )?),
            scan: ScanSettings {
                workers: parse_or("SCAN_WORKERS", get("SCAN_WORKERS"), defaults.workers)?.max(1),
                holders_page_size: parse_or("HOLDERS_PAGE_SIZE", get("HOLDERS_PAGE_SIZE"), defaults.holders_page_size)?,
                activity_page_size: parse_or(
                    "ACTIVITY_PAGE_SIZE",
                    get("ACTIVITY_PAGE_SIZE"),
                    defaults.activity_page_size,
                )?,
                max_holders: get("MAX_HOLDERS")
                    .map(|v| parse_value("MAX_HOLDERS", &v))
                    .transpose()?,
            },
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        })
    }
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T, String> {
    match value {
        Some(v) => parse_value(key, &v),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, String> {
    value
        .parse::<T>()
        .map_err(|_| format!("{} must be a non-negative integer, got '{}'", key, value))
}
