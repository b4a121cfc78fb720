//! Upstream rate provider port.
//!
//! This trait defines the interface for exchange rate sources.
//! Implementations can be HTTP clients, scrapers, mock providers, etc.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::domain::{Endpoint, ProviderCode, RateRequest, RateResponse, calendar};
use crate::error::ProviderError;

/// Static facts about a provider, assembled from configuration at startup.
///
/// The core treats this as a read-only snapshot: where the provider lives,
/// when its daily table is generated, what it quotes, and how far back its
/// history goes.
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    pub code: ProviderCode,
    /// Timezone the provider publishes in.
    pub location: Tz,
    /// Wall-clock time (in `location`) at which the daily table is final.
    pub rates_generated_time: NaiveTime,
    /// Empty for providers that need no key.
    pub api_key: String,
    pub supported_currencies: Vec<String>,
    /// Whether the backfill orchestrator should fill history for this
    /// provider.
    pub historical_preload: bool,
    /// Earliest date with data, when known.
    pub historical_start_date: Option<NaiveDate>,
}

impl ProviderDescriptor {
    pub fn supports(&self, currency: &str) -> bool {
        self.supported_currencies.iter().any(|c| c == currency)
    }

    /// Today's date in the provider's timezone.
    pub fn today_local(&self) -> NaiveDate {
        calendar::today_in(self.location)
    }

    /// The most recent date whose table is final as of `now`.
    pub fn finalized_date(&self, now: DateTime<Utc>) -> NaiveDate {
        calendar::finalized_date(now, self.rates_generated_time, self.location)
    }

    /// Whether `now` is at or past today's generation boundary.
    pub fn past_generation_time(&self, now: DateTime<Utc>) -> bool {
        calendar::past_generation_time(now, self.rates_generated_time, self.location)
    }

    /// Checks the rules every provider shares: the date must exist in the
    /// provider's history, and all currencies must be ones it quotes.
    /// Provider-specific constraints come on top in each implementation.
    pub fn validate_request(&self, request: &RateRequest) -> Result<(), ProviderError> {
        if request.date > self.today_local() {
            return Err(ProviderError::InvalidRequest(format!(
                "date {} is in the future for provider {}",
                request.date, self.code
            )));
        }
        if let Some(start) = self.historical_start_date {
            if request.date < start {
                return Err(ProviderError::InvalidRequest(format!(
                    "provider {} has no data before {}",
                    self.code, start
                )));
            }
        }
        if !self.supports(&request.base_currency) {
            return Err(ProviderError::InvalidRequest(format!(
                "base currency {} is not supported by provider {}",
                request.base_currency, self.code
            )));
        }
        for symbol in &request.symbols {
            if !self.supports(symbol) {
                return Err(ProviderError::InvalidRequest(format!(
                    "currency {} is not supported by provider {}",
                    symbol, self.code
                )));
            }
        }
        Ok(())
    }
}

/// A full day's table from a bulk-snapshot provider, quoted in both
/// directions against the provider's anchor currency.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    /// Anchor -> quoted currency.
    pub direct: BTreeMap<String, f64>,
    /// Quoted currency -> anchor.
    pub reverse: BTreeMap<String, f64>,
    pub generated_at: DateTime<Utc>,
}

impl RateTable {
    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.reverse.is_empty()
    }
}

/// Port trait for upstream rate providers.
#[async_trait::async_trait]
pub trait RatesProvider: Send + Sync {
    fn descriptor(&self) -> &ProviderDescriptor;

    /// Request validation. The default covers the shared rules; providers
    /// with extra constraints layer them on top.
    fn validate(&self, request: &RateRequest) -> Result<(), ProviderError> {
        self.descriptor().validate_request(request)
    }

    /// Fetches rates for a specific past date, shaped to the request's base
    /// and symbols.
    async fn fetch_historical(&self, request: &RateRequest)
    -> Result<RateResponse, ProviderError>;

    /// Fetches the most recent rates. Providers whose latest table is not
    /// final yet may answer with yesterday's historical data instead.
    async fn fetch_latest(&self, request: &RateRequest) -> Result<RateResponse, ProviderError>;

    /// Which endpoint and date a "latest" request maps to at `now`. Scraped
    /// providers whose daily table is not final yet point at yesterday's
    /// historical data instead.
    fn latest_target(&self, now: DateTime<Utc>) -> (Endpoint, NaiveDate) {
        (Endpoint::Latest, now.date_naive())
    }

    /// Fetches the full table for a date, optionally persisting every pair.
    /// Providers without a bulk snapshot return an empty table.
    async fn preload(&self, date: NaiveDate, persist: bool) -> Result<RateTable, ProviderError>;
}
