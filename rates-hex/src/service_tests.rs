//! RatesService unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone, Utc};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use rates_types::{
        AppError, CurrencyRateFact, Endpoint, FactQuery, ProviderCode, ProviderDescriptor,
        RateRequest, RateStore, StoreError, StoredRate,
    };

    use crate::RatesService;
    use crate::cache::MemoryCache;
    use crate::providers::{EmiratesProvider, FixerProvider, ProviderRegistry, emirates, fixer};
    use crate::resolver::TieredResolver;

    /// Simple in-memory store for testing the service layer.
    pub struct MockStore {
        facts: Mutex<Vec<CurrencyRateFact>>,
    }

    impl MockStore {
        pub fn new() -> Self {
            Self {
                facts: Mutex::new(Vec::new()),
            }
        }

        pub fn fact_count(&self) -> usize {
            self.facts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RateStore for MockStore {
        async fn find_rates(&self, query: &FactQuery) -> Result<Vec<StoredRate>, StoreError> {
            Ok(self
                .facts
                .lock()
                .unwrap()
                .iter()
                .filter(|f| {
                    f.provider == query.provider
                        && f.endpoint == query.endpoint
                        && f.base_currency == query.base_currency
                        && f.rate_date == query.rate_date
                        && query.symbols.contains(&f.quoted_currency)
                })
                .map(|f| StoredRate {
                    quoted_currency: f.quoted_currency.clone(),
                    value: f.value,
                    provider_generated_time: f.provider_generated_time,
                })
                .collect())
        }

        async fn upsert_fact(&self, fact: &CurrencyRateFact) -> Result<(), StoreError> {
            let mut facts = self.facts.lock().unwrap();
            let exists = facts.iter().any(|f| {
                f.base_currency == fact.base_currency
                    && f.quoted_currency == fact.quoted_currency
                    && f.rate_date == fact.rate_date
                    && f.provider == fact.provider
                    && f.endpoint == fact.endpoint
            });
            if !exists {
                facts.push(fact.clone());
            }
            Ok(())
        }

        async fn max_rate_date(
            &self,
            provider: ProviderCode,
            endpoint: Endpoint,
        ) -> Result<Option<NaiveDate>, StoreError> {
            Ok(self
                .facts
                .lock()
                .unwrap()
                .iter()
                .filter(|f| f.provider == provider && f.endpoint == endpoint)
                .map(|f| f.rate_date)
                .max())
        }
    }

    fn emirates_descriptor() -> ProviderDescriptor {
        ProviderDescriptor {
            code: ProviderCode::Emirates,
            location: chrono_tz::Asia::Dubai,
            rates_generated_time: chrono::NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            api_key: String::new(),
            supported_currencies: emirates::default_supported_currencies(),
            historical_preload: true,
            historical_start_date: NaiveDate::from_ymd_opt(2018, 11, 1),
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

    /// Wires a full service over the mock store, with both providers pointed
    /// at `server_url`.
    fn service(server_url: &str) -> (RatesService<MockStore>, Arc<MockStore>) {
        let store = Arc::new(MockStore::new());
        let client = reqwest::Client::new();
        let registry = Arc::new(ProviderRegistry::new(
            EmiratesProvider::new(
                emirates_descriptor(),
                format!("{}/en/fx-rates-ajax", server_url),
                client.clone(),
                Arc::clone(&store),
            ),
            FixerProvider::new(fixer_descriptor(), server_url, client),
        ));
        let memory = Arc::new(MemoryCache::new(Duration::from_secs(60)));
        let resolver = TieredResolver::new(memory, Arc::clone(&store));
        (RatesService::new(registry, resolver), store)
    }

    fn fixer_request(date: NaiveDate, base: &str, symbols: Vec<&str>) -> RateRequest {
        RateRequest::new(
            Endpoint::Historical,
            ProviderCode::Fixer,
            chrono_tz::UTC,
            date,
            base,
            symbols.into_iter().map(String::from).collect(),
            false,
        )
    }

    fn rate_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
    }

    async fn seed_fact(store: &MockStore, quoted: &str, value: f64) {
        let generated = Utc.with_ymd_and_hms(2024, 1, 5, 23, 59, 59).unwrap();
        let fact = CurrencyRateFact::new(
            ProviderCode::Fixer,
            Endpoint::Historical,
            "EUR",
            quoted,
            value,
            rate_date(),
            generated,
        );
        store.upsert_fact(&fact).await.unwrap();
    }

    fn fixer_body(rates: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "success": true,
            "timestamp": 1_704_495_599,
            "base": "EUR",
            "date": "2024-01-05",
            "rates": rates,
        })
    }

    #[tokio::test]
    async fn test_equal_currency_needs_no_lookup() {
        // The base URL is unroutable: any provider call would error out.
        let (service, store) = service("http://unreachable.invalid");

        let response = service
            .get_rates(&fixer_request(rate_date(), "EUR", vec!["EUR"]))
            .await
            .unwrap();

        assert_eq!(response.rates.len(), 1);
        assert_eq!(response.rates["EUR"], 1.0);
        assert_eq!(store.fact_count(), 0);
    }

    #[tokio::test]
    async fn test_durable_hit_skips_the_provider() {
        let (service, store) = service("http://unreachable.invalid");
        seed_fact(&store, "USD", 1.092346).await;
        seed_fact(&store, "GBP", 0.857143).await;

        let response = service
            .get_rates(&fixer_request(rate_date(), "EUR", vec!["USD", "GBP"]))
            .await
            .unwrap();

        assert_eq!(response.rates["USD"], 1.092346);
        assert_eq!(response.rates["GBP"], 0.857143);
        // The stored generation instant travels with the cached answer.
        let generated = Utc.with_ymd_and_hms(2024, 1, 5, 23, 59, 59).unwrap();
        assert_eq!(response.timestamp, generated.timestamp());
    }

    #[tokio::test]
    async fn test_fetch_writes_back_and_memory_serves_repeats() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2024-01-05"))
            .and(query_param("access_key", "test-key"))
            .and(query_param("base", "EUR"))
            .and(query_param("symbols", "GBP,USD"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixer_body(
                serde_json::json!({"USD": 1.092346, "GBP": 0.857143}),
            )))
            .expect(1)
            .mount(&server)
            .await;

        let (service, store) = service(&server.uri());
        let request = fixer_request(rate_date(), "EUR", vec!["USD", "GBP"]);

        let first = service.get_rates(&request).await.unwrap();
        assert_eq!(first.rates["USD"], 1.092346);
        assert_eq!(store.fact_count(), 2);

        // Second identical call never leaves the process; the mock's
        // expectation of exactly one request verifies it on drop.
        let second = service.get_rates(&request).await.unwrap();
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn test_partial_durable_coverage_fetches_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2024-01-05"))
            .and(query_param("symbols", "GBP,USD"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixer_body(
                serde_json::json!({"USD": 1.092346, "GBP": 0.857143}),
            )))
            .expect(1)
            .mount(&server)
            .await;

        let (service, store) = service(&server.uri());
        // Only one of the two requested symbols is stored.
        seed_fact(&store, "USD", 0.5).await;

        let response = service
            .get_rates(&fixer_request(rate_date(), "EUR", vec!["USD", "GBP"]))
            .await
            .unwrap();

        // The answer comes from upstream, not the partial rows.
        assert_eq!(response.rates["USD"], 1.092346);
        assert_eq!(response.rates["GBP"], 0.857143);

        // Write-back fills the gap but never overwrites the existing fact.
        assert_eq!(store.fact_count(), 2);
        let rows = store
            .find_rates(&FactQuery {
                provider: ProviderCode::Fixer,
                endpoint: Endpoint::Historical,
                base_currency: "EUR".to_string(),
                symbols: vec!["USD".to_string()],
                rate_date: rate_date(),
            })
            .await
            .unwrap();
        assert_eq!(rows[0].value, 0.5);
    }

    #[tokio::test]
    async fn test_latest_stays_out_of_the_durable_store() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest"))
            .and(query_param("base", "EUR"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixer_body(
                serde_json::json!({"USD": 1.095}),
            )))
            .expect(1)
            .mount(&server)
            .await;

        let (service, store) = service(&server.uri());
        let mut request = fixer_request(Utc::now().date_naive(), "EUR", vec!["USD"]);
        request.endpoint = Endpoint::Latest;

        let first = service.get_rates(&request).await.unwrap();
        assert_eq!(first.rates["USD"], 1.095);
        assert_eq!(store.fact_count(), 0);

        // Repeats come from the memory tier, still without persistence.
        let second = service.get_rates(&request).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(store.fact_count(), 0);
    }

    #[tokio::test]
    async fn test_force_bypasses_tiers_and_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2024-01-05"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixer_body(
                serde_json::json!({"USD": 1.092346}),
            )))
            .expect(1)
            .mount(&server)
            .await;

        let (service, store) = service(&server.uri());
        seed_fact(&store, "USD", 0.5).await;

        let mut request = fixer_request(rate_date(), "EUR", vec!["USD"]);
        request.force = true;

        let response = service.get_rates(&request).await.unwrap();
        assert_eq!(response.rates["USD"], 1.092346);

        // The stored fact survives untouched and nothing new is admitted.
        assert_eq!(store.fact_count(), 1);
        let rows = store
            .find_rates(&FactQuery {
                provider: ProviderCode::Fixer,
                endpoint: Endpoint::Historical,
                base_currency: "EUR".to_string(),
                symbols: vec!["USD".to_string()],
                rate_date: rate_date(),
            })
            .await
            .unwrap();
        assert_eq!(rows[0].value, 0.5);
    }

    #[tokio::test]
    async fn test_upstream_failure_surfaces_as_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2024-01-05"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (service, _store) = service(&server.uri());
        let result = service
            .get_rates(&fixer_request(rate_date(), "EUR", vec!["USD"]))
            .await;

        assert!(matches!(result, Err(AppError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_unsupported_symbol_is_rejected_before_http() {
        let (service, _store) = service("http://unreachable.invalid");

        let result = service
            .get_rates(&fixer_request(rate_date(), "EUR", vec!["XXQ"]))
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
