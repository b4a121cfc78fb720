//! Shared database types with feature-gated fields for SQLite and PostgreSQL.

use sqlx::FromRow;

use rates_types::{StoreError, StoredRate};

// ─────────────────────────────────────────────────────────────────────────────
// Feature-gated imports
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(not(feature = "sqlite"))]
use chrono::{DateTime, Utc};

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Stored rate projection returned by lookups.
///
/// SQLite keeps timestamps as RFC3339 text; Postgres keeps them as
/// TIMESTAMPTZ. `rate_date` is plain `YYYY-MM-DD` text in both engines so no
/// session timezone can shift the day.
#[derive(FromRow)]
pub struct DbStoredRate {
    pub quoted_currency: String,
    pub value: f64,

    #[cfg(not(feature = "sqlite"))]
    pub provider_generated_time: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub provider_generated_time: String,
}

/// Aggregate row for the newest stored rate date.
#[derive(FromRow)]
pub struct DbMaxRateDate {
    pub max_date: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn parse_rate_date(s: &str) -> Result<chrono::NaiveDate, StoreError> {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| StoreError::Database(format!("Bad rate_date {:?}: {}", s, e)))
}

#[cfg(feature = "sqlite")]
pub fn parse_timestamp(s: &str) -> Result<chrono::DateTime<chrono::Utc>, StoreError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| StoreError::Database(e.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion (feature-gated implementations)
// ─────────────────────────────────────────────────────────────────────────────

impl DbStoredRate {
    /// Convert database row to domain StoredRate.
    pub fn into_domain(self) -> Result<StoredRate, StoreError> {
        #[cfg(not(feature = "sqlite"))]
        let provider_generated_time = self.provider_generated_time;

        #[cfg(feature = "sqlite")]
        let provider_generated_time = parse_timestamp(&self.provider_generated_time)?;

        Ok(StoredRate {
            quoted_currency: self.quoted_currency,
            value: self.value,
            provider_generated_time,
        })
    }
}

impl DbMaxRateDate {
    pub fn into_domain(self) -> Result<Option<chrono::NaiveDate>, StoreError> {
        self.max_date.as_deref().map(parse_rate_date).transpose()
    }
}
