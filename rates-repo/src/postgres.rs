//! PostgreSQL rate store adapter.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use rates_types::{
    CurrencyRateFact, Endpoint, FactQuery, ProviderCode, RateStore, StoreError, StoredRate,
};

use crate::types::{DbMaxRateDate, DbStoredRate};

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Store
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL rate store implementation.
pub struct PostgresStore {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_currency_rates_pg.sql"),
        "0001",
    )
    .await?;

    Ok(())
}

impl PostgresStore {
    /// Creates a new PostgreSQL store with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the database schema (for testing with existing pool).
    pub async fn create_schema(&self) -> Result<(), StoreError> {
        run_migrations(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl RateStore for PostgresStore {
    async fn find_rates(&self, query: &FactQuery) -> Result<Vec<StoredRate>, StoreError> {
        let rows: Vec<DbStoredRate> = sqlx::query_as(
            r#"SELECT quoted_currency, value, provider_generated_time
               FROM currency_rate
               WHERE provider = $1 AND endpoint = $2 AND base_currency = $3 AND rate_date = $4
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
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               ON CONFLICT (base_currency, quoted_currency, rate_date, provider, endpoint) DO NOTHING"#,
        )
        .bind(fact.provider.as_str())
        .bind(fact.endpoint.as_str())
        .bind(&fact.base_currency)
        .bind(&fact.quoted_currency)
        .bind(fact.value)
        .bind(fact.rate_date.format("%Y-%m-%d").to_string())
        .bind(fact.request_time)
        .bind(fact.provider_generated_time)
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
               WHERE provider = $1 AND endpoint = $2"#,
        )
        .bind(provider.as_str())
        .bind(endpoint.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        row.into_domain()
    }
}
