//! fixer.io REST provider.
//!
//! A conventional JSON API: server-side symbol filtering, a real latest
//! endpoint, no bulk day table. The durable tier is filled only through the
//! resolver's admission path, and backfill is off for it by default.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Deserialize;

use rates_types::domain::rounding::{RATE_SCALE, to_fixed};
use rates_types::domain::{RateRequest, RateResponse};
use rates_types::error::ProviderError;
use rates_types::ports::{ProviderDescriptor, RateTable, RatesProvider};

/// Default production endpoint.
pub const DEFAULT_BASE_URL: &str = "https://data.fixer.io/api";

/// Configuration default for the supported set: the majors available on
/// every plan. Deployments with a broader subscription override this through
/// configuration.
pub fn default_supported_currencies() -> Vec<String> {
    [
        "AED", "AUD", "BGN", "BRL", "CAD", "CHF", "CNY", "CZK", "DKK", "EUR", "GBP", "HKD",
        "HUF", "IDR", "ILS", "INR", "ISK", "JPY", "KRW", "MXN", "MYR", "NOK", "NZD", "PHP",
        "PLN", "RON", "RUB", "SEK", "SGD", "THB", "TRY", "USD", "ZAR",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Wire shape shared by the historical and latest endpoints.
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    success: bool,
    #[serde(default)]
    timestamp: i64,
    #[serde(default)]
    rates: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    info: String,
}

impl ApiEnvelope {
    /// Checks the provider-reported outcome and normalizes the rates.
    fn into_response(self) -> Result<RateResponse, ProviderError> {
        if !self.success {
            let detail = match self.error {
                Some(err) if !err.info.is_empty() => err.info,
                Some(err) => format!("error code {} ({})", err.code, err.kind),
                None => "reported failure without detail".to_string(),
            };
            return Err(ProviderError::Upstream(format!("fixer: {}", detail)));
        }
        let Some(rates) = self.rates else {
            return Err(ProviderError::Upstream(
                "fixer: success response carried no rates".into(),
            ));
        };
        let rates = rates
            .into_iter()
            .map(|(code, value)| (code, to_fixed(value, RATE_SCALE)))
            .collect();
        Ok(RateResponse::new(rates, self.timestamp))
    }
}

pub struct FixerProvider {
    descriptor: ProviderDescriptor,
    base_url: String,
    client: reqwest::Client,
}

impl FixerProvider {
    pub fn new(
        descriptor: ProviderDescriptor,
        base_url: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            descriptor,
            base_url: base_url.into(),
            client,
        }
    }

    /// One GET against `{base_url}/{segment}` with the request's parameters.
    async fn fetch(
        &self,
        segment: &str,
        request: &RateRequest,
    ) -> Result<RateResponse, ProviderError> {
        self.validate(request)?;

        let symbols = request.symbols.join(",");
        let url = format!("{}/{}", self.base_url, segment);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("access_key", self.descriptor.api_key.as_str()),
                ("base", request.base_currency.as_str()),
                ("symbols", symbols.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Upstream(format!("fixer request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| ProviderError::Upstream(format!("fixer rejected the request: {}", e)))?;
        let envelope: ApiEnvelope = response
            .json()
            .await
            .map_err(|e| ProviderError::Upstream(format!("fixer payload is not valid JSON: {}", e)))?;
        envelope.into_response()
    }
}

#[async_trait::async_trait]
impl RatesProvider for FixerProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn fetch_historical(
        &self,
        request: &RateRequest,
    ) -> Result<RateResponse, ProviderError> {
        let segment = request.date.format("%Y-%m-%d").to_string();
        self.fetch(&segment, request).await
    }

    async fn fetch_latest(&self, request: &RateRequest) -> Result<RateResponse, ProviderError> {
        self.fetch("latest", request).await
    }

    /// No bulk day snapshot exists upstream.
    async fn preload(&self, _date: NaiveDate, _persist: bool) -> Result<RateTable, ProviderError> {
        Ok(RateTable::default())
    }
}
