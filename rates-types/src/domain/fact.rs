//! Durable currency rate facts.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::request::{Endpoint, ProviderCode};
use super::rounding::{RATE_SCALE, to_fixed};

/// One directed currency pair quote for one day from one provider endpoint.
///
/// Facts are immutable once stored: the unique key
/// `(base_currency, quoted_currency, rate_date, provider, endpoint)` is
/// upserted with first-write-wins semantics, so re-fetches and concurrent
/// writers never overwrite an existing value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyRateFact {
    pub provider: ProviderCode,
    pub endpoint: Endpoint,
    /// Base currency of the pair.
    pub base_currency: String,
    /// Quoted currency of the pair.
    pub quoted_currency: String,
    /// Rate value, normalized to six decimal places.
    pub value: f64,
    /// The day the rate belongs to. Persisted as text so no engine or server
    /// timezone can shift it.
    pub rate_date: NaiveDate,
    /// When we fetched the rate from the provider (UTC).
    pub request_time: DateTime<Utc>,
    /// When the provider generated the rate table (UTC).
    pub provider_generated_time: DateTime<Utc>,
}

impl CurrencyRateFact {
    /// Builds a fact with the value normalized and `request_time` stamped now.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: ProviderCode,
        endpoint: Endpoint,
        base_currency: impl Into<String>,
        quoted_currency: impl Into<String>,
        value: f64,
        rate_date: NaiveDate,
        provider_generated_time: DateTime<Utc>,
    ) -> Self {
        Self {
            provider,
            endpoint,
            base_currency: base_currency.into(),
            quoted_currency: quoted_currency.into(),
            value: to_fixed(value, RATE_SCALE),
            rate_date,
            request_time: Utc::now(),
            provider_generated_time,
        }
    }
}
