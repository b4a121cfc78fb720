//! Data Transfer Objects (DTOs) for requests and responses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Endpoint, RateRequest, RateResponse};

// ─────────────────────────────────────────────────────────────────────────────
// Query DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Query parameters accepted by both rate endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RatesQuery {
    /// Base currency (three-letter code).
    pub base: Option<String>,
    /// Comma-separated quote currencies.
    pub symbols: Option<String>,
    /// Skip every cache tier. Parsed leniently; anything unrecognized is
    /// treated as false.
    pub force: Option<String>,
}

impl RatesQuery {
    /// Lenient boolean semantics of the `force` parameter.
    pub fn force_flag(&self) -> bool {
        matches!(
            self.force.as_deref(),
            Some("1") | Some("t") | Some("T") | Some("true") | Some("TRUE") | Some("True")
        )
    }

    /// Splits the `symbols` parameter into raw entries.
    pub fn symbol_list(&self) -> Vec<String> {
        self.symbols
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Response DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Successful rates payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatesSuccess {
    /// Always true for this shape.
    pub success: bool,
    /// True when the historical endpoint served the request.
    pub historical: bool,
    /// The rate date, `YYYY-MM-DD`.
    pub date: String,
    /// Unix seconds at which the provider generated the rates.
    pub timestamp: i64,
    /// Base currency of the request.
    pub base: String,
    /// Quote currency -> rate.
    pub rates: BTreeMap<String, f64>,
}

impl RatesSuccess {
    /// Shapes a resolved response for the wire.
    pub fn from_parts(request: &RateRequest, response: &RateResponse) -> Self {
        Self {
            success: true,
            historical: request.endpoint == Endpoint::Historical,
            date: request.date.format("%Y-%m-%d").to_string(),
            timestamp: response.timestamp,
            base: request.base_currency.clone(),
            rates: response.rates.clone(),
        }
    }
}

/// Error detail carried by failure responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// HTTP status code of the failure.
    pub code: u16,
    /// Human-readable message.
    pub info: String,
}

/// Failure payload: `{"success": false, "error": {"code": .., "info": ".."}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatesFailure {
    pub success: bool,
    pub error: ErrorBody,
}

impl RatesFailure {
    pub fn new(code: u16, info: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorBody {
                code,
                info: info.into(),
            },
        }
    }
}
