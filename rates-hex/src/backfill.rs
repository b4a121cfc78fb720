//! Historical backfill orchestrator.
//!
//! Keeps the durable tier contiguous per provider: from the day after the
//! newest stored date (or the configured history start) through the most
//! recent finalized date. Each missing day is one bulk `preload` with
//! persistence on, bounded by a semaphore and padded with a politeness
//! delay. A failed day is logged and skipped; the next run picks it up
//! again.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use rand::Rng;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use rates_types::domain::{Endpoint, ProviderCode, calendar};
use rates_types::error::StoreError;
use rates_types::ports::RateStore;

use crate::providers::ProviderRegistry;

/// Outcome counts for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BackfillReport {
    pub attempted: usize,
    pub loaded: usize,
    pub failed: usize,
}

impl BackfillReport {
    fn merge(&mut self, other: BackfillReport) {
        self.attempted += other.attempted;
        self.loaded += other.loaded;
        self.failed += other.failed;
    }
}

/// The inclusive span of days missing from the durable tier.
///
/// With stored rows the span starts the day after the newest one; on an
/// empty table it starts at the configured history start. No rows and no
/// configured start means there is nothing to do.
fn missing_range(
    stored_max: Option<NaiveDate>,
    configured_start: Option<NaiveDate>,
    end: NaiveDate,
) -> Vec<NaiveDate> {
    let start = match stored_max {
        Some(max) => max + chrono::Duration::days(1),
        None => match configured_start {
            Some(start) => start,
            None => return Vec::new(),
        },
    };
    calendar::date_range(start, end)
}

pub struct Backfill<S: RateStore> {
    store: Arc<S>,
    registry: Arc<ProviderRegistry<S>>,
    parallelism: usize,
    max_delay_ms: u64,
}

impl<S: RateStore> Backfill<S> {
    pub fn new(
        store: Arc<S>,
        registry: Arc<ProviderRegistry<S>>,
        parallelism: usize,
        max_delay_ms: u64,
    ) -> Self {
        Self {
            store,
            registry,
            parallelism: parallelism.max(1),
            max_delay_ms,
        }
    }

    /// Fills the gap for every preload-enabled provider. Never aborts the
    /// batch: store and fetch failures are logged and the run carries on.
    pub async fn run(&self) -> BackfillReport {
        let mut total = BackfillReport::default();
        for code in ProviderCode::ALL {
            if !self.registry.descriptor(code).historical_preload {
                continue;
            }
            match self.run_provider(code).await {
                Ok(report) => total.merge(report),
                Err(e) => {
                    error!(provider = %code, error = %e, "backfill could not read stored history");
                }
            }
        }
        total
    }

    async fn run_provider(&self, code: ProviderCode) -> Result<BackfillReport, StoreError> {
        let descriptor = self.registry.descriptor(code);
        // The boundary is re-evaluated on every run so a long-lived process
        // keeps absorbing new days.
        let end = descriptor.finalized_date(Utc::now());
        let stored_max = self.store.max_rate_date(code, Endpoint::Historical).await?;
        let gap = missing_range(stored_max, descriptor.historical_start_date, end);
        if gap.is_empty() {
            info!(provider = %code, "history is contiguous, nothing to backfill");
            return Ok(BackfillReport::default());
        }

        info!(
            provider = %code,
            days = gap.len(),
            from = %gap[0],
            to = %end,
            "backfilling history"
        );

        let mut report = BackfillReport {
            attempted: gap.len(),
            ..BackfillReport::default()
        };
        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let mut handles = Vec::with_capacity(gap.len());
        for date in gap {
            let semaphore = Arc::clone(&semaphore);
            let registry = Arc::clone(&self.registry);
            let max_delay_ms = self.max_delay_ms;
            handles.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return false;
                };
                let delay = rand::rng().random_range(0..=max_delay_ms);
                tokio::time::sleep(Duration::from_millis(delay)).await;
                match registry.get(code).preload(date, true).await {
                    Ok(_) => true,
                    Err(e) => {
                        warn!(provider = %code, %date, error = %e, "backfill fetch failed");
                        false
                    }
                }
            }));
        }
        for handle in handles {
            match handle.await {
                Ok(true) => report.loaded += 1,
                Ok(false) => report.failed += 1,
                Err(e) => {
                    warn!(provider = %code, error = %e, "backfill task aborted");
                    report.failed += 1;
                }
            }
        }

        info!(
            provider = %code,
            loaded = report.loaded,
            failed = report.failed,
            "backfill run finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{EmiratesProvider, FixerProvider, ProviderRegistry, emirates, fixer};
    use crate::service_tests::tests::MockStore;
    use rates_types::ports::ProviderDescriptor;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Most recent finalized date for the test descriptor (23:00 Dubai).
    fn finalized_end() -> NaiveDate {
        calendar::finalized_date(
            Utc::now(),
            chrono::NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            chrono_tz::Asia::Dubai,
        )
    }

    #[test]
    fn test_missing_range_continues_after_stored_max() {
        let gap = missing_range(Some(date(2024, 1, 10)), None, date(2024, 1, 13));
        assert_eq!(
            gap,
            vec![date(2024, 1, 11), date(2024, 1, 12), date(2024, 1, 13)]
        );
    }

    #[test]
    fn test_missing_range_empty_when_contiguous() {
        assert!(missing_range(Some(date(2024, 1, 13)), None, date(2024, 1, 13)).is_empty());
        // Stored data ahead of the finalized date also yields nothing.
        assert!(missing_range(Some(date(2024, 1, 14)), None, date(2024, 1, 13)).is_empty());
    }

    #[test]
    fn test_missing_range_starts_from_configured_start() {
        let gap = missing_range(None, Some(date(2024, 1, 12)), date(2024, 1, 13));
        assert_eq!(gap, vec![date(2024, 1, 12), date(2024, 1, 13)]);
        assert!(missing_range(None, None, date(2024, 1, 13)).is_empty());
    }

    fn emirates_descriptor(start: NaiveDate) -> ProviderDescriptor {
        ProviderDescriptor {
            code: ProviderCode::Emirates,
            location: chrono_tz::Asia::Dubai,
            rates_generated_time: chrono::NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            api_key: String::new(),
            supported_currencies: emirates::default_supported_currencies(),
            historical_preload: true,
            historical_start_date: Some(start),
        }
    }

    fn fixer_descriptor() -> ProviderDescriptor {
        ProviderDescriptor {
            code: ProviderCode::Fixer,
            location: chrono_tz::UTC,
            rates_generated_time: chrono::NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
            api_key: "test-key".to_string(),
            supported_currencies: fixer::default_supported_currencies(),
            historical_preload: false,
            historical_start_date: None,
        }
    }

    fn registry(
        server_url: &str,
        store: &Arc<MockStore>,
        start: NaiveDate,
    ) -> Arc<ProviderRegistry<MockStore>> {
        let emirates = EmiratesProvider::new(
            emirates_descriptor(start),
            format!("{}/en/fx-rates-ajax", server_url),
            reqwest::Client::new(),
            Arc::clone(store),
        );
        let fixer = FixerProvider::new(fixer_descriptor(), "http://unused.invalid", reqwest::Client::new());
        Arc::new(ProviderRegistry::new(emirates, fixer))
    }

    async fn mount_day(server: &MockServer, day: &str) {
        let body = serde_json::json!({
            "table": "<table><tbody>\
                <tr><td>US Dollar</td><td>3.672500</td></tr>\
                <tr><td>Euro</td><td>4.043000</td></tr>\
                </tbody></table>",
            "last_updated": "05 Jan 2024 6:00 PM",
        });
        Mock::given(method("GET"))
            .and(path("/en/fx-rates-ajax"))
            .and(query_param("date", day))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    /// Seeds the store so the provider's stored history ends at `max_date`.
    async fn seed_history(store: &Arc<MockStore>, max_date: NaiveDate) {
        let fact = rates_types::domain::CurrencyRateFact::new(
            ProviderCode::Emirates,
            Endpoint::Historical,
            "AED",
            "USD",
            0.2723,
            max_date,
            Utc::now(),
        );
        store.upsert_fact(&fact).await.unwrap();
    }

    #[tokio::test]
    async fn test_backfill_loads_each_missing_day() {
        let server = MockServer::start().await;
        // History ends two finalized days ago: exactly two days to load.
        let end = finalized_end();
        let max_stored = end - chrono::Duration::days(2);
        for day in [end - chrono::Duration::days(1), end] {
            mount_day(&server, &day.format("%Y-%m-%d").to_string()).await;
        }

        let store = Arc::new(MockStore::new());
        seed_history(&store, max_stored).await;
        let registry = registry(&server.uri(), &store, date(2024, 1, 1));
        let backfill = Backfill::new(Arc::clone(&store), registry, 2, 0);

        let report = backfill.run().await;
        assert_eq!(report.attempted, 2);
        assert_eq!(report.loaded, 2);
        assert_eq!(report.failed, 0);
        // Seed row + 2 days x 2 rows x both directions.
        assert_eq!(store.fact_count(), 1 + 2 * 4);

        // Re-running finds a contiguous history and inserts nothing.
        let report = backfill.run().await;
        assert_eq!(report.attempted, 0);
        assert_eq!(store.fact_count(), 1 + 2 * 4);
    }

    #[tokio::test]
    async fn test_backfill_skips_failed_days_and_continues() {
        let server = MockServer::start().await;
        let store = Arc::new(MockStore::new());
        let registry = registry(&server.uri(), &store, date(2024, 1, 1));
        let end = finalized_end();
        seed_history(&store, end - chrono::Duration::days(3)).await;

        // Only two of the three missing days exist upstream; the third gets
        // the mock server's 404.
        for day in [end - chrono::Duration::days(2), end] {
            mount_day(&server, &day.format("%Y-%m-%d").to_string()).await;
        }

        let backfill = Backfill::new(Arc::clone(&store), Arc::clone(&registry), 2, 0);
        let report = backfill.run().await;
        assert_eq!(report.attempted, 3);
        assert_eq!(report.loaded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(store.fact_count(), 1 + 2 * 4);
    }
}
