//! # Rates Types
//!
//! Domain types and port traits for the forex rates service.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (RateRequest, RateResponse, CurrencyRateFact)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Store, provider and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    CurrencyRateFact, Endpoint, ProviderCode, RateRequest, RateResponse, calendar, rounding,
};
pub use dto::*;
pub use error::{AppError, ProviderError, StoreError};
pub use ports::{FactQuery, ProviderDescriptor, RateStore, RateTable, RatesProvider, StoredRate};
