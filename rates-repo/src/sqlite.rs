//! SQLite rate store adapter.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use std::str::FromStr;

use rates_types::{
    CurrencyRateFact, Endpoint, FactQuery, ProviderCode, RateStore, StoreError, StoredRate,
};

use crate::types::{DbMaxRateDate, DbStoredRate};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Store
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite rate store implementation.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Creates a new SQLite store with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            // Remove query parameters
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        // Run migration from migration file
        let ddl = include_str!("../migrations/0001_create_currency_rates.sql");
        sqlx::query(ddl).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema (for testing with existing pool).
    pub async fn create_schema(&self) -> Result<(), StoreError> {
        let ddl = include_str!("../migrations/0001_create_currency_rates.sql");
        sqlx::query(ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl RateStore for SqliteStore {
    async fn find_rates(&self, query: &FactQuery) -> Result<Vec<StoredRate>, StoreError> {
        let rows: Vec<DbStoredRate> = sqlx::query_as(
            r#"SELECT quoted_currency, value, provider_generated_time
               FROM currency_rate
               WHERE provider = ? AND endpoint = ? AND base_currency = ? AND rate_date = ?
               ORDER BY quoted_currency ASC"#,
        )
        .bind(query.provider.as_str())
        .bind(query.endpoint.as_str())
        .bind(&query.base_currency)
        .bind(query.rate_date.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.into_iter()
            .filter(|row| query.symbols.iter().any(|s| *s == row.quoted_currency))
            .map(DbStoredRate::into_domain)
            .collect()
    }

    async fn upsert_fact(&self, fact: &CurrencyRateFact) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO currency_rate
               (provider, endpoint, base_currency, quoted_currency, value, rate_date, request_time, provider_generated_time)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT (base_currency, quoted_currency, rate_date, provider, endpoint) DO NOTHING"#,
        )
        .bind(fact.provider.as_str())
        .bind(fact.endpoint.as_str())
        .bind(&fact.base_currency)
        .bind(&fact.quoted_currency)
        .bind(fact.value)
        .bind(fact.rate_date.format("%Y-%m-%d").to_string())
        .bind(fact.request_time.to_rfc3339())
        .bind(fact.provider_generated_time.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    async fn max_rate_date(
        &self,
        provider: ProviderCode,
        endpoint: Endpoint,
    ) -> Result<Option<NaiveDate>, StoreError> {
        // rate_date is YYYY-MM-DD text, so MAX sorts chronologically.
        let row: DbMaxRateDate = sqlx::query_as(
            r#"SELECT MAX(rate_date) AS max_date FROM currency_rate
               WHERE provider = ? AND endpoint = ?"#,
        )
        .bind(provider.as_str())
        .bind(endpoint.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        row.into_domain()
    }
}
