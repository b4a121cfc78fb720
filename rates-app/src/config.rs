//! Configuration loading from environment.

use std::env;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};

use rates_hex::providers::{emirates, fixer};
use rates_types::{ProviderCode, ProviderDescriptor, calendar};

/// Application configuration.
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub memory_cache_ttl: Duration,
    pub memory_cache_cleanup: Duration,
    pub backfill_parallelism: usize,
    pub backfill_max_delay_ms: u64,
    pub http_timeout: Duration,
    pub rate_limit_per_minute: u32,
    pub emirates: ProviderConfig,
    pub fixer: ProviderConfig,
}

/// One provider's startup wiring, read from `EMIRATES_*` / `FIXER_*`.
pub struct ProviderConfig {
    pub descriptor: ProviderDescriptor,
    pub base_url: String,
}

impl Config {
    /// Loads configuration from environment variables. Every variable has a
    /// default; a set-but-unparsable value is an error naming the variable.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            port: parse_var("PORT", "8080")?,
            database_url: var_or("DATABASE_URL", "sqlite://rates.db"),
            memory_cache_ttl: Duration::from_secs(parse_var("MEMORY_CACHE_TTL_SECS", "30")?),
            memory_cache_cleanup: Duration::from_secs(parse_var(
                "MEMORY_CACHE_CLEANUP_SECS",
                "60",
            )?),
            backfill_parallelism: parse_var("BACKFILL_PARALLELISM", "4")?,
            backfill_max_delay_ms: parse_var("BACKFILL_MAX_DELAY_MS", "1000")?,
            http_timeout: Duration::from_secs(parse_var("HTTP_TIMEOUT_SECS", "30")?),
            rate_limit_per_minute: parse_var("RATE_LIMIT_PER_MINUTE", "120")?,
            emirates: emirates_config()?,
            fixer: fixer_config()?,
        })
    }
}

fn emirates_config() -> anyhow::Result<ProviderConfig> {
    Ok(ProviderConfig {
        descriptor: ProviderDescriptor {
            code: ProviderCode::Emirates,
            location: parse_var("EMIRATES_TIMEZONE", "Asia/Dubai")?,
            rates_generated_time: generation_time_var("EMIRATES_GENERATION_TIME", "23:00:00")?,
            api_key: var_or("EMIRATES_API_KEY", ""),
            supported_currencies: currency_list("EMIRATES_CURRENCIES")
                .unwrap_or_else(emirates::default_supported_currencies),
            historical_preload: parse_var("EMIRATES_PRELOAD", "true")?,
            historical_start_date: optional_date("EMIRATES_START_DATE", Some("2018-11-01"))?,
        },
        base_url: var_or("EMIRATES_BASE_URL", emirates::DEFAULT_BASE_URL),
    })
}

fn fixer_config() -> anyhow::Result<ProviderConfig> {
    Ok(ProviderConfig {
        descriptor: ProviderDescriptor {
            code: ProviderCode::Fixer,
            location: parse_var("FIXER_TIMEZONE", "UTC")?,
            rates_generated_time: generation_time_var("FIXER_GENERATION_TIME", "23:59:59")?,
            api_key: var_or("FIXER_API_KEY", ""),
            supported_currencies: currency_list("FIXER_CURRENCIES")
                .unwrap_or_else(fixer::default_supported_currencies),
            historical_preload: parse_var("FIXER_PRELOAD", "false")?,
            historical_start_date: optional_date("FIXER_START_DATE", None)?,
        },
        base_url: var_or("FIXER_BASE_URL", fixer::DEFAULT_BASE_URL),
    })
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    let raw = var_or(name, default);
    raw.parse()
        .map_err(|e| anyhow::anyhow!("invalid {}={}: {}", name, raw, e))
}

/// Generation times are strict `HH:MM:SS` wall-clock values.
fn generation_time_var(name: &str, default: &str) -> anyhow::Result<NaiveTime> {
    calendar::parse_generation_time(&var_or(name, default))
        .map_err(|e| anyhow::anyhow!("{}: {}", name, e))
}

/// Comma-separated currency override. Unset or blank means "use the
/// provider's built-in list".
fn currency_list(name: &str) -> Option<Vec<String>> {
    let raw = env::var(name).ok()?;
    let mut list: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .collect();
    list.sort();
    list.dedup();
    (!list.is_empty()).then_some(list)
}

fn optional_date(name: &str, default: Option<&str>) -> anyhow::Result<Option<NaiveDate>> {
    let raw = match env::var(name) {
        Ok(raw) => raw,
        Err(_) => match default {
            Some(d) => d.to_string(),
            None => return Ok(None),
        },
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|e| anyhow::anyhow!("invalid {}={}: {}", name, raw, e))
}
