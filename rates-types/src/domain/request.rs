//! Rate request domain model.

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Which provider endpoint a request targets.
///
/// `Historical` serves a finalized daily table and may be answered from the
/// durable tier; `Latest` is intraday and only ever lives in the memory tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    Historical,
    Latest,
}

impl Endpoint {
    /// Returns the wire/storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Historical => "historical",
            Endpoint::Latest => "latest",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "historical" => Ok(Endpoint::Historical),
            "latest" => Ok(Endpoint::Latest),
            other => Err(format!("unknown endpoint: {}", other)),
        }
    }
}

/// The closed set of rate providers.
///
/// Providers are compiled in and selected by code; an unrecognized code is
/// rejected when the request is decoded, there is no runtime registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderCode {
    Emirates,
    Fixer,
}

impl ProviderCode {
    /// All known providers, in registry order.
    pub const ALL: [ProviderCode; 2] = [ProviderCode::Emirates, ProviderCode::Fixer];

    /// Returns the wire/storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderCode::Emirates => "emirates",
            ProviderCode::Fixer => "fixer",
        }
    }
}

impl std::fmt::Display for ProviderCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "emirates" => Ok(ProviderCode::Emirates),
            "fixer" => Ok(ProviderCode::Fixer),
            other => Err(format!("unknown provider code: {}", other)),
        }
    }
}

/// A fully decoded request for exchange rates.
///
/// This is the unit the resolver, the providers and the cache tiers all work
/// with. Construction canonicalizes the symbol list so that equal requests
/// produce equal cache keys regardless of the order the caller typed them in.
#[derive(Debug, Clone, PartialEq)]
pub struct RateRequest {
    pub endpoint: Endpoint,
    pub provider: ProviderCode,
    /// IANA timezone of the provider's publishing center.
    pub provider_location: Tz,
    /// Requested rate date. For `Latest` this is resolved at the boundary
    /// before the request enters the resolver.
    pub date: NaiveDate,
    pub base_currency: String,
    /// Canonicalized: uppercased, deduplicated, sorted.
    pub symbols: Vec<String>,
    /// Bypass every cache tier, reads and writes alike.
    pub force: bool,
    /// Set when a `Latest` fetch was redirected to `Historical` internally;
    /// suppresses the provider-side durable write for the redirected fetch.
    pub is_forwarded: bool,
}

impl RateRequest {
    /// Builds a request with a canonicalized symbol set.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        endpoint: Endpoint,
        provider: ProviderCode,
        provider_location: Tz,
        date: NaiveDate,
        base_currency: impl Into<String>,
        symbols: Vec<String>,
        force: bool,
    ) -> Self {
        let mut symbols: Vec<String> = symbols
            .into_iter()
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        symbols.sort();
        symbols.dedup();

        Self {
            endpoint,
            provider,
            provider_location,
            date,
            base_currency: base_currency.into().trim().to_ascii_uppercase(),
            symbols,
            force,
            is_forwarded: false,
        }
    }

    /// Canonical memory-tier cache key.
    ///
    /// `force` and `is_forwarded` are deliberately excluded: they change how a
    /// request is served, not what it asks for.
    pub fn cache_key(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            self.provider,
            self.endpoint,
            self.date.format("%Y-%m-%d"),
            self.base_currency,
            self.symbols.join("+"),
        )
    }

    /// True when the only requested symbol equals the base currency.
    pub fn is_equal_currency(&self) -> bool {
        self.symbols.len() == 1 && self.symbols[0] == self.base_currency
    }

    /// Durable-tier admission rule: the rate must be final (strictly before
    /// the provider-local today), the endpoint must not be `Latest`, and the
    /// request must not be forced.
    pub fn write_eligible(&self, provider_today: NaiveDate) -> bool {
        self.endpoint != Endpoint::Latest && self.date < provider_today && !self.force
    }

    /// Rewrites a `Latest` request into the `Historical` request it resolves
    /// to. The forwarded request is never forced and never persisted by the
    /// provider itself.
    pub fn forwarded_to_historical(&self, date: NaiveDate) -> Self {
        let mut req = self.clone();
        req.endpoint = Endpoint::Historical;
        req.date = date;
        req.force = false;
        req.is_forwarded = true;
        req
    }

    /// Requested symbols minus the base currency. The durable tier never
    /// stores the identity pair, so lookups work on this list.
    pub fn symbols_without_base(&self) -> Vec<String> {
        self.symbols
            .iter()
            .filter(|s| *s != &self.base_currency)
            .cloned()
            .collect()
    }
}
