//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The application layer depends on these traits, not concrete implementations.

mod provider;
mod store;

pub use provider::{ProviderDescriptor, RateTable, RatesProvider};
pub use store::{FactQuery, RateStore, StoredRate};
