//! Upstream rate providers.
//!
//! The provider set is closed: every `ProviderCode` maps to exactly one
//! implementation compiled into the registry, so an unknown provider cannot
//! get past request decoding. Each implementation owns its descriptor and a
//! `reqwest` client with a finite timeout.

pub mod emirates;
pub mod fixer;

pub use emirates::EmiratesProvider;
pub use fixer::FixerProvider;

use std::time::Duration;

use rates_types::domain::ProviderCode;
use rates_types::ports::{ProviderDescriptor, RateStore, RatesProvider};

/// Builds the outbound HTTP client the providers share.
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// Compile-time registry of the provider implementations.
pub struct ProviderRegistry<S: RateStore> {
    emirates: EmiratesProvider<S>,
    fixer: FixerProvider,
}

impl<S: RateStore> ProviderRegistry<S> {
    pub fn new(emirates: EmiratesProvider<S>, fixer: FixerProvider) -> Self {
        Self { emirates, fixer }
    }

    /// The implementation behind `code`.
    pub fn get(&self, code: ProviderCode) -> &dyn RatesProvider {
        match code {
            ProviderCode::Emirates => &self.emirates,
            ProviderCode::Fixer => &self.fixer,
        }
    }

    /// Descriptor shortcut for boundary and scheduling decisions.
    pub fn descriptor(&self, code: ProviderCode) -> &ProviderDescriptor {
        self.get(code).descriptor()
    }
}
