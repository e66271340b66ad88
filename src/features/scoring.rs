//! Fantasy point scoring
//!
//! A fixed-weight linear combination of box score counting stats.

use crate::{BoxscoreRow, ScoringConfig};

impl ScoringConfig {
    /// Fantasy points for one game
    pub fn fantasy_points(&self, row: &BoxscoreRow) -> f64 {
        self.points * row.points as f64
            + self.rebounds * row.rebounds as f64
            + self.assists * row.assists as f64
            + self.steals * row.steals as f64
            + self.blocks * row.blocks as f64
            + self.turnovers * row.turnovers as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::boxscore;

    #[test]
    fn test_default_weights() {
        let mut row = boxscore("g1", 1, 1, 2, 25, 10, 8);
        row.steals = 2;
        row.blocks = 1;
        row.turnovers = 3;

        // 25 + 12 + 12 + 6 + 3 - 3
        let fp = ScoringConfig::default().fantasy_points(&row);
        assert!((fp - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_custom_weights() {
        let scoring = ScoringConfig {
            points: 1.0,
            rebounds: 1.0,
            assists: 1.0,
            steals: 0.0,
            blocks: 0.0,
            turnovers: 0.0,
        };
        let row = boxscore("g1", 1, 1, 2, 10, 5, 5);
        assert_eq!(scoring.fantasy_points(&row), 20.0);
    }

    #[test]
    fn test_empty_line_scores_zero() {
        let row = boxscore("g1", 1, 1, 2, 0, 0, 0);
        assert_eq!(ScoringConfig::default().fantasy_points(&row), 0.0);
    }
}
