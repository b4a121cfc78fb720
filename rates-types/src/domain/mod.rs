//! Domain models for the forex rates service.

pub mod calendar;
pub mod fact;
pub mod request;
pub mod response;
pub mod rounding;

pub use fact::CurrencyRateFact;
pub use request::{Endpoint, ProviderCode, RateRequest};
pub use response::RateResponse;
