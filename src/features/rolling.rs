//! Rolling player windows
//!
//! Trailing windows of a player's most recent games before an as-of date.

use crate::data::DatedBoxscore;
use crate::ScoringConfig;
use chrono::NaiveDate;

/// One game inside a rolling window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowGame {
    pub date: NaiveDate,
    pub fantasy_points: f64,
    pub minutes: f64,
}

/// The most recent games of a player, oldest first
#[derive(Debug, Clone, Default)]
pub struct RollingWindow {
    games: Vec<WindowGame>,
}

impl RollingWindow {
    /// Take the last `size` games from a chronological history, skipping
    /// rows below `min_minutes`
    pub fn trailing(
        history: &[&DatedBoxscore],
        size: usize,
        min_minutes: f64,
        scoring: &ScoringConfig,
    ) -> Self {
        let mut games: Vec<WindowGame> = history
            .iter()
            .rev()
            .filter(|g| g.row.minutes >= min_minutes)
            .take(size)
            .map(|g| WindowGame {
                date: g.date,
                fantasy_points: scoring.fantasy_points(&g.row),
                minutes: g.row.minutes,
            })
            .collect();
        games.reverse();
        RollingWindow { games }
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn games(&self) -> &[WindowGame] {
        &self.games
    }

    /// Fantasy points per game in window order
    pub fn scores(&self) -> Vec<f64> {
        self.games.iter().map(|g| g.fantasy_points).collect()
    }

    /// Mean fantasy points, None for an empty window
    pub fn mean_fantasy_points(&self) -> Option<f64> {
        mean(&self.scores())
    }

    pub fn mean_minutes(&self) -> Option<f64> {
        let minutes: Vec<f64> = self.games.iter().map(|g| g.minutes).collect();
        mean(&minutes)
    }

    /// Date of the most recent game in the window
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.games.last().map(|g| g.date)
    }
}

/// Arithmetic mean, None for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::scoring_row;
    use crate::GameId;

    fn history(points: &[u16]) -> Vec<DatedBoxscore> {
        points
            .iter()
            .enumerate()
            .map(|(i, &p)| DatedBoxscore {
                date: NaiveDate::from_ymd_opt(2024, 11, 1 + i as u32).unwrap(),
                row: scoring_row(&format!("g{}", i), 1, 1, 2, p),
            })
            .collect()
    }

    #[test]
    fn test_window_takes_most_recent() {
        let rows = history(&[100, 10, 20, 30]);
        let refs: Vec<&DatedBoxscore> = rows.iter().collect();
        let window = RollingWindow::trailing(&refs, 3, 0.0, &ScoringConfig::default());

        assert_eq!(window.scores(), vec![10.0, 20.0, 30.0]);
        assert_eq!(window.mean_fantasy_points(), Some(20.0));
        assert_eq!(
            window.last_date(),
            Some(NaiveDate::from_ymd_opt(2024, 11, 4).unwrap())
        );
    }

    #[test]
    fn test_short_history_uses_available_games() {
        let rows = history(&[12, 18]);
        let refs: Vec<&DatedBoxscore> = rows.iter().collect();
        let window = RollingWindow::trailing(&refs, 10, 0.0, &ScoringConfig::default());
        assert_eq!(window.len(), 2);
        assert_eq!(window.mean_fantasy_points(), Some(15.0));
    }

    #[test]
    fn test_min_minutes_filter() {
        let mut rows = history(&[10, 40, 20]);
        rows[1].row.minutes = 2.0;
        rows[1].row.game_id = GameId::from("garbage-time");
        let refs: Vec<&DatedBoxscore> = rows.iter().collect();
        let window = RollingWindow::trailing(&refs, 10, 5.0, &ScoringConfig::default());
        assert_eq!(window.scores(), vec![10.0, 20.0]);
        assert_eq!(window.mean_minutes(), Some(30.0));
    }

    #[test]
    fn test_empty_window() {
        let window = RollingWindow::trailing(&[], 10, 0.0, &ScoringConfig::default());
        assert!(window.is_empty());
        assert_eq!(window.mean_fantasy_points(), None);
        assert_eq!(mean(&[]), None);
    }
}
