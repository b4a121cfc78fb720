//! Rate response domain model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The resolved rates for a request.
///
/// `timestamp` is the provider's rate generation instant (unix seconds), not
/// the time we served the request. Durable hits reconstruct it from the stored
/// `provider_generated_time`, so a cached answer carries the same timestamp as
/// the original fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateResponse {
    /// Quote currency -> rate. Ordered map so serialization is deterministic.
    pub rates: BTreeMap<String, f64>,

    /// Unix seconds at which the provider generated these rates.
    pub timestamp: i64,
}

impl RateResponse {
    pub fn new(rates: BTreeMap<String, f64>, timestamp: i64) -> Self {
        Self { rates, timestamp }
    }

    /// Response holding a single pair.
    pub fn single(symbol: impl Into<String>, value: f64, timestamp: i64) -> Self {
        let mut rates = BTreeMap::new();
        rates.insert(symbol.into(), value);
        Self { rates, timestamp }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_pair_response() {
        let resp = RateResponse::single("USD", 0.272294, 1_704_441_600);
        assert_eq!(resp.rates.len(), 1);
        assert_eq!(resp.rates["USD"], 0.272294);
        assert_eq!(resp.timestamp, 1_704_441_600);
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let mut rates = BTreeMap::new();
        rates.insert("USD".to_string(), 0.2723);
        rates.insert("EUR".to_string(), 0.2512);
        let resp = RateResponse::new(rates, 1000);

        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"rates":{"EUR":0.2512,"USD":0.2723},"timestamp":1000}"#);
    }
}
