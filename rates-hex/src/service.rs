//! Rates Application Service
//!
//! Orchestrates rate lookups through the resolver and the provider registry.
//! Contains NO infrastructure logic - pure business orchestration.

use std::sync::Arc;

use chrono::Utc;

use rates_types::{
    AppError, Endpoint, ProviderCode, ProviderDescriptor, RateRequest, RateResponse, RateStore,
};

use crate::providers::ProviderRegistry;
use crate::resolver::TieredResolver;

/// Application service for exchange-rate lookups.
///
/// Generic over `S: RateStore` - the storage adapter is injected at compile time.
/// This enables:
/// - Swapping stores without code changes
/// - Testing with an in-memory store
/// - Compile-time checks for port implementation
pub struct RatesService<S: RateStore> {
    registry: Arc<ProviderRegistry<S>>,
    resolver: TieredResolver<S>,
}

impl<S: RateStore> RatesService<S> {
    /// Creates a new rates service over the given registry and resolver.
    pub fn new(registry: Arc<ProviderRegistry<S>>, resolver: TieredResolver<S>) -> Self {
        Self { registry, resolver }
    }

    /// Returns the provider registry. Handlers use it to shape requests
    /// against provider-local calendars before calling [`get_rates`].
    ///
    /// [`get_rates`]: RatesService::get_rates
    pub fn registry(&self) -> &ProviderRegistry<S> {
        &self.registry
    }

    /// Returns the descriptor for `code`.
    pub fn descriptor(&self, code: ProviderCode) -> &ProviderDescriptor {
        self.registry.descriptor(code)
    }

    /// Serves one rate lookup.
    ///
    /// A base currency quoted against itself is answered inline. Everything
    /// else goes through the resolver tiers first; on a miss the provider is
    /// called and the result admitted back into the tiers.
    pub async fn get_rates(&self, request: &RateRequest) -> Result<RateResponse, AppError> {
        if request.is_equal_currency() {
            return Ok(RateResponse::single(
                request.base_currency.clone(),
                1.0,
                Utc::now().timestamp(),
            ));
        }

        if let Some(found) = self.resolver.resolve(request).await? {
            return Ok(found);
        }

        let provider = self.registry.get(request.provider);
        let response = match request.endpoint {
            Endpoint::Historical => provider.fetch_historical(request).await?,
            Endpoint::Latest => provider.fetch_latest(request).await?,
        };

        let provider_today = provider.descriptor().today_local();
        self.resolver
            .admit(request, &response, provider_today)
            .await;

        Ok(response)
    }
}
