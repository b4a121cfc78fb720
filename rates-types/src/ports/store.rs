//! Durable rate store port.
//!
//! This is the primary storage port in the hexagonal architecture.
//! Adapters (Postgres, SQLite) implement this trait.

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{CurrencyRateFact, Endpoint, ProviderCode};
use crate::error::StoreError;

/// Filter for point lookups of stored facts: one provider endpoint, one base,
/// one day, a set of quote currencies.
#[derive(Debug, Clone)]
pub struct FactQuery {
    pub provider: ProviderCode,
    pub endpoint: Endpoint,
    pub base_currency: String,
    pub symbols: Vec<String>,
    pub rate_date: NaiveDate,
}

/// Projection of a stored fact returned by lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRate {
    pub quoted_currency: String,
    pub value: f64,
    pub provider_generated_time: DateTime<Utc>,
}

/// The durable rate store port.
///
/// Writes are idempotent upserts on the fact's unique key: concurrent writers
/// racing on the same key must not error and must leave exactly one row.
#[async_trait::async_trait]
pub trait RateStore: Send + Sync + 'static {
    /// Loads the stored rates matching the query. Missing symbols simply do
    /// not appear in the result; deciding whether a partial answer counts is
    /// the caller's business.
    async fn find_rates(&self, query: &FactQuery) -> Result<Vec<StoredRate>, StoreError>;

    /// Inserts a fact unless its unique key already exists (first write
    /// wins).
    async fn upsert_fact(&self, fact: &CurrencyRateFact) -> Result<(), StoreError>;

    /// The newest stored rate date for a provider endpoint, if any rows
    /// exist. Drives backfill gap computation.
    async fn max_rate_date(
        &self,
        provider: ProviderCode,
        endpoint: Endpoint,
    ) -> Result<Option<NaiveDate>, StoreError>;
}
