//! # Rates Hex
//!
//! Application service layer and HTTP adapter for the rates service.
//!
//! ## Architecture
//!
//! - `service` - Application service (orchestrates cache, store and providers)
//! - `providers/` - Upstream rate sources (central bank scraper, REST API)
//! - `cache` / `resolver` - Memory tier and the tiered read path
//! - `backfill` / `schedule` - History preload and background jobs
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! The service is generic over `S: RateStore`, allowing different store
//! implementations to be injected.

pub mod backfill;
pub mod cache;
pub mod inbound;
pub mod providers;
pub mod resolver;
pub mod schedule;
pub mod service;

#[cfg(test)]
mod service_tests;

pub use service::RatesService;
