//! Tiered cache resolver.
//!
//! The read path consults the memory tier first and the durable store second;
//! the write path admits responses back into each tier under its own rules.
//! Exactly two tiers, wired explicitly. The resolver never talks to
//! providers: a miss here is the service's cue to fetch.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, error};

use rates_types::domain::{CurrencyRateFact, Endpoint, RateRequest, RateResponse};
use rates_types::error::{AppError, StoreError};
use rates_types::ports::{FactQuery, RateStore};

use crate::cache::MemoryCache;

/// Two-stage read-through cache over the memory tier and the durable store.
pub struct TieredResolver<S: RateStore> {
    memory: Arc<MemoryCache>,
    store: Arc<S>,
}

impl<S: RateStore> TieredResolver<S> {
    pub fn new(memory: Arc<MemoryCache>, store: Arc<S>) -> Self {
        Self { memory, store }
    }

    /// Tries to answer `request` from the caches.
    ///
    /// `Ok(None)` is a miss. Forced requests miss unconditionally; `Latest`
    /// requests never reach the durable tier. A durable row set that covers
    /// only part of the requested symbols counts as a miss, not a partial
    /// answer. Store `NotFound` is a miss; any other store failure aborts
    /// instead of silently degrading to a provider fetch.
    pub async fn resolve(&self, request: &RateRequest) -> Result<Option<RateResponse>, AppError> {
        if request.force {
            return Ok(None);
        }

        let key = request.cache_key();
        if let Some(hit) = self.memory.get(&key) {
            debug!(%key, "memory tier hit");
            return Ok(Some(hit));
        }

        if request.endpoint != Endpoint::Historical {
            return Ok(None);
        }

        // The identity pair is never stored, so look up everything else.
        let wanted = request.symbols_without_base();
        if wanted.is_empty() {
            return Ok(None);
        }

        let query = FactQuery {
            provider: request.provider,
            endpoint: request.endpoint,
            base_currency: request.base_currency.clone(),
            symbols: wanted.clone(),
            rate_date: request.date,
        };
        let rows = match self.store.find_rates(&query).await {
            Ok(rows) => rows,
            Err(StoreError::NotFound) => return Ok(None),
            Err(e) => return Err(AppError::Storage(e.to_string())),
        };

        if rows.len() < wanted.len() {
            debug!(
                %key,
                found = rows.len(),
                wanted = wanted.len(),
                "durable tier covers only part of the request, treating as miss"
            );
            return Ok(None);
        }

        // Full coverage. Rows are non-empty here, so the generation instant
        // of the stored table is available.
        let generated = rows[0].provider_generated_time;
        let mut rates: BTreeMap<String, f64> = rows
            .into_iter()
            .map(|row| (row.quoted_currency, row.value))
            .collect();
        if request.symbols.iter().any(|s| *s == request.base_currency) {
            rates.insert(request.base_currency.clone(), 1.0);
        }

        let response = RateResponse::new(rates, generated.timestamp());
        debug!(%key, "durable tier hit, promoting to memory");
        self.memory.put(key, response.clone());
        Ok(Some(response))
    }

    /// Writes a freshly fetched response back into the tiers.
    ///
    /// Memory admission is unconditional for non-forced requests; durable
    /// admission additionally requires write eligibility against the
    /// provider-local today. Durable write failures are logged and swallowed:
    /// the response is already in hand and first-write-wins makes the next
    /// fetch retry the insert.
    pub async fn admit(
        &self,
        request: &RateRequest,
        response: &RateResponse,
        provider_today: NaiveDate,
    ) {
        if request.force {
            return;
        }

        self.memory.put(request.cache_key(), response.clone());

        if !request.write_eligible(provider_today) {
            return;
        }

        let generated =
            DateTime::<Utc>::from_timestamp(response.timestamp, 0).unwrap_or_else(Utc::now);
        for (symbol, value) in &response.rates {
            if *symbol == request.base_currency {
                continue;
            }
            let fact = CurrencyRateFact::new(
                request.provider,
                request.endpoint,
                &request.base_currency,
                symbol,
                *value,
                request.date,
                generated,
            );
            if let Err(e) = self.store.upsert_fact(&fact).await {
                error!(
                    error = %e,
                    base = %fact.base_currency,
                    quoted = %fact.quoted_currency,
                    date = %fact.rate_date,
                    "failed to persist rate fact"
                );
            }
        }
    }
}
