//! Consistency score
//!
//! Inverse volatility of a player's recent fantasy scores, on a 0-100 scale.

/// Means below this leave the coefficient of variation undefined.
const MEAN_EPSILON: f64 = 1e-9;

/// Mean and population standard deviation of a set of scores
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dispersion {
    pub mean: f64,
    pub std_dev: f64,
}

impl Dispersion {
    /// None for an empty slice
    pub fn from_scores(scores: &[f64]) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }
        let n = scores.len() as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        Some(Dispersion {
            mean,
            std_dev: variance.sqrt(),
        })
    }

    /// Standard deviation over the mean; None when the mean is not positive
    pub fn coefficient_of_variation(&self) -> Option<f64> {
        if self.mean < MEAN_EPSILON {
            return None;
        }
        let cv = self.std_dev / self.mean;
        cv.is_finite().then_some(cv)
    }
}

/// Map a coefficient of variation onto [0, 100], higher meaning steadier
pub fn consistency_score(cv: f64) -> f64 {
    (100.0 - cv * 100.0).clamp(0.0, 100.0)
}

/// Consistency of a window of scores, None when undefined
pub fn consistency_from_scores(scores: &[f64]) -> Option<f64> {
    Dispersion::from_scores(scores)
        .and_then(|d| d.coefficient_of_variation())
        .map(consistency_score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_population_std_dev() {
        let d = Dispersion::from_scores(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(d.mean, 5.0);
        assert!((d.std_dev - 2.0).abs() < 1e-12);
        assert!((d.coefficient_of_variation().unwrap() - 0.4).abs() < 1e-12);
        assert!((consistency_from_scores(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_identical_scores_are_fully_consistent() {
        assert_eq!(consistency_from_scores(&[30.0, 30.0, 30.0]), Some(100.0));
        // A single game has no spread
        assert_eq!(consistency_from_scores(&[41.2]), Some(100.0));
    }

    #[test]
    fn test_zero_mean_is_undefined() {
        assert_eq!(consistency_from_scores(&[0.0, 0.0]), None);
        assert_eq!(consistency_from_scores(&[-5.0, 5.0]), None);
        assert_eq!(consistency_from_scores(&[]), None);
    }

    #[test]
    fn test_negative_mean_is_undefined() {
        // Turnovers alone score below zero
        assert_eq!(consistency_from_scores(&[-1.0, -1.0, -2.0]), None);
        assert_eq!(consistency_from_scores(&[-10.0, 4.0]), None);
        assert!(Dispersion::from_scores(&[-3.0])
            .unwrap()
            .coefficient_of_variation()
            .is_none());
    }

    #[test]
    fn test_score_is_clamped() {
        assert_eq!(consistency_score(0.0), 100.0);
        assert_eq!(consistency_score(1.5), 0.0);
        assert_eq!(consistency_score(-0.5), 100.0);
    }

    #[test]
    fn test_score_non_increasing_in_cv() {
        let mut previous = f64::INFINITY;
        for step in 0..300 {
            let cv = step as f64 * 0.01;
            let score = consistency_score(cv);
            assert!(score <= previous);
            assert!((0.0..=100.0).contains(&score));
            previous = score;
        }
    }
}
