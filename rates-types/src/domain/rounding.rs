//! Rate value normalization.
//!
//! Every rate that leaves a provider or enters storage goes through
//! [`to_fixed`] so that cache tiers, durable rows and API responses all carry
//! the same representation of the same quote.

/// Decimal places every stored and served rate is normalized to.
pub const RATE_SCALE: u32 = 6;

/// Rounds `num` to `precision` decimal places, half away from zero.
pub fn to_fixed(num: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (num * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounds_to_six_places() {
        assert_eq!(to_fixed(3.672500123, RATE_SCALE), 3.6725);
        assert_eq!(to_fixed(0.272294467, RATE_SCALE), 0.272294);
        assert_eq!(to_fixed(42.1183074, RATE_SCALE), 42.118307);
    }

    #[test]
    fn test_rounds_half_away_from_zero() {
        assert_eq!(to_fixed(2.5, 0), 3.0);
        assert_eq!(to_fixed(-2.5, 0), -3.0);
        assert_eq!(to_fixed(0.5, 0), 1.0);
        assert_eq!(to_fixed(-1.5, 0), -2.0);
    }

    #[test]
    fn test_inversion_round_trip_within_tolerance() {
        // Reverse quotes at or below one: rounding, inverting and rounding
        // again, then inverting back, lands within one unit in the sixth
        // decimal place of the normalized original.
        for raw in [0.002751, 0.0236425, 0.272294, 0.985321] {
            let reverse = to_fixed(raw, RATE_SCALE);
            let direct = to_fixed(1.0 / reverse, RATE_SCALE);
            let back = to_fixed(1.0 / direct, RATE_SCALE);
            assert!(
                (back - reverse).abs() <= 1e-6,
                "round trip drifted: {} -> {} -> {}",
                reverse,
                direct,
                back
            );
        }
    }

    #[test]
    fn test_inversion_is_stable_after_first_cycle() {
        // Quotes above one lose absolute precision on the first inversion
        // cycle, but a second cycle reproduces the first exactly. Repeated
        // re-fetches of the same logical rate cannot keep drifting.
        let cycle = |x: f64| to_fixed(1.0 / to_fixed(1.0 / x, RATE_SCALE), RATE_SCALE);
        for raw in [3.6725, 11.950021, 42.118307] {
            let once = cycle(raw);
            assert_eq!(cycle(once), once);
        }
    }
}
