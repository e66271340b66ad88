//! Forecast combinator
//!
//! `forecast = fppg * dvp_factor * (0.5 + 0.5 * consistency / 100)`
//!
//! Consistency scales the matchup-adjusted base between 50% and 100%.

use crate::features::FeatureRecord;
use crate::{NbaError, PlayerId, Result};
use serde::Serialize;

/// Combine the three feature values into a forecast.
///
/// Inputs are never imputed: non-finite values, a negative fppg or DvP factor,
/// or a consistency outside [0, 100] are rejected.
pub fn combine(fppg: f64, dvp_factor: f64, consistency: f64) -> Result<f64> {
    if !fppg.is_finite() || fppg < 0.0 {
        return Err(NbaError::InvalidInput {
            name: "fppg",
            value: fppg,
        });
    }
    if !dvp_factor.is_finite() || dvp_factor < 0.0 {
        return Err(NbaError::InvalidInput {
            name: "dvp_factor",
            value: dvp_factor,
        });
    }
    if !consistency.is_finite() || !(0.0..=100.0).contains(&consistency) {
        return Err(NbaError::InvalidInput {
            name: "consistency",
            value: consistency,
        });
    }

    Ok(fppg * dvp_factor * (0.5 + 0.5 * consistency / 100.0))
}

/// One row of forecast output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRecord {
    pub player_id: PlayerId,
    pub player: String,
    /// Team abbreviation
    pub team: String,
    pub opponent: String,
    pub fppg: f64,
    pub consistency: f64,
    pub dvp_factor: f64,
    pub dvp_low_confidence: bool,
    pub games_used: usize,
    pub forecast: f64,
}

impl ForecastRecord {
    pub fn from_features(
        features: &FeatureRecord,
        player: &str,
        team: &str,
        opponent: &str,
    ) -> Result<Self> {
        let forecast = combine(features.fppg, features.dvp.factor, features.consistency)?;
        Ok(ForecastRecord {
            player_id: features.player,
            player: player.to_string(),
            team: team.to_string(),
            opponent: opponent.to_string(),
            fppg: features.fppg,
            consistency: features.consistency,
            dvp_factor: features.dvp.factor,
            dvp_low_confidence: features.dvp.low_confidence,
            games_used: features.games_used,
            forecast,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_example() {
        // 41.2 * 1.05 * 0.94
        let forecast = combine(41.2, 1.05, 88.0).unwrap();
        assert!((forecast - 40.6644).abs() < 1e-9);
        assert_eq!(format!("{:.2}", forecast), "40.66");
    }

    #[test]
    fn test_consistency_bounds_output() {
        assert_eq!(combine(40.0, 1.0, 0.0).unwrap(), 20.0);
        assert_eq!(combine(40.0, 1.0, 100.0).unwrap(), 40.0);
    }

    #[test]
    fn test_partial_monotonicity() {
        let base = combine(30.0, 1.0, 50.0).unwrap();
        assert!(combine(31.0, 1.0, 50.0).unwrap() >= base);
        assert!(combine(30.0, 1.1, 50.0).unwrap() >= base);
        assert!(combine(30.0, 1.0, 51.0).unwrap() >= base);

        let mut previous = f64::NEG_INFINITY;
        for c in 0..=100 {
            let value = combine(25.0, 0.9, c as f64).unwrap();
            assert!(value >= previous);
            previous = value;
        }
    }

    #[test]
    fn test_rejects_invalid_inputs() {
        assert!(matches!(
            combine(f64::NAN, 1.0, 50.0),
            Err(NbaError::InvalidInput { name: "fppg", .. })
        ));
        assert!(matches!(
            combine(30.0, f64::INFINITY, 50.0),
            Err(NbaError::InvalidInput { name: "dvp_factor", .. })
        ));
        assert!(combine(30.0, -0.5, 50.0).is_err());
        assert!(combine(30.0, 1.0, 101.0).is_err());
        assert!(combine(30.0, 1.0, f64::NAN).is_err());
    }

    #[test]
    fn test_negative_fppg_rejected() {
        assert!(matches!(
            combine(-10.0, 1.0, 0.0),
            Err(NbaError::InvalidInput { name: "fppg", .. })
        ));
        assert!(combine(-10.0, 1.0, 100.0).is_err());
        assert_eq!(combine(0.0, 1.2, 75.0).unwrap(), 0.0);
    }
}
