//! Per-game feature history
//!
//! For every recorded box score, the rolling features a forecaster would
//! have seen before tip-off. Only strictly earlier games contribute, and the
//! windows apply the same minutes threshold as the feature engine.

use crate::data::{DatedBoxscore, Snapshot};
use crate::features::rolling::RollingWindow;
use crate::{FeatureConfig, GameId, PlayerId, ScoringConfig, TeamId};
use chrono::NaiveDate;
use serde::Serialize;

/// Games in the short form window
const SHORT_WINDOW: usize = 5;

/// Rolling features as of one game
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureHistoryRow {
    pub game_id: GameId,
    pub game_date: NaiveDate,
    pub player_id: PlayerId,
    pub team_id: TeamId,
    pub opponent_team_id: TeamId,
    pub minutes: f64,
    pub fantasy_points: f64,
    pub fp_last_5: Option<f64>,
    /// Mean over `features.window` games, the engine's fppg for this date
    pub fp_window: Option<f64>,
    pub minutes_last_5: Option<f64>,
    /// Days since the previous appearance of any length
    pub days_rest: Option<i64>,
}

/// Build the history table in (date, game, player) order
pub fn feature_history(
    snapshot: &Snapshot,
    features: &FeatureConfig,
    scoring: &ScoringConfig,
) -> Vec<FeatureHistoryRow> {
    let mut out = Vec::with_capacity(snapshot.row_count());

    for player in snapshot.players() {
        let games = snapshot.player_games_before(player.id, NaiveDate::MAX);

        for (i, game) in games.iter().enumerate() {
            // Rows dated the same day as this game are not prior information
            let prior = games[..i].iter().filter(|g| g.date < game.date).count();
            out.push(history_row(game, &games[..prior], features, scoring));
        }
    }

    out.sort_by(|a, b| {
        (a.game_date, &a.game_id, a.player_id).cmp(&(b.game_date, &b.game_id, b.player_id))
    });
    out
}

fn history_row(
    game: &DatedBoxscore,
    prior: &[&DatedBoxscore],
    features: &FeatureConfig,
    scoring: &ScoringConfig,
) -> FeatureHistoryRow {
    let short = RollingWindow::trailing(prior, SHORT_WINDOW, features.min_minutes, scoring);
    let long = RollingWindow::trailing(prior, features.window, features.min_minutes, scoring);

    FeatureHistoryRow {
        game_id: game.row.game_id.clone(),
        game_date: game.date,
        player_id: game.row.player_id,
        team_id: game.row.team_id,
        opponent_team_id: game.row.opponent_team_id,
        minutes: game.row.minutes,
        fantasy_points: scoring.fantasy_points(&game.row),
        fp_last_5: short.mean_fantasy_points(),
        fp_window: long.mean_fantasy_points(),
        minutes_last_5: short.mean_minutes(),
        days_rest: prior.last().map(|prev| (game.date - prev.date).num_days()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{game, player, scoring_row, team};
    use crate::features::FeatureEngine;
    use crate::{Config, Position};

    #[test]
    fn test_history_uses_only_prior_games() {
        let snapshot = Snapshot::new(
            vec![team(1, "AAA"), team(2, "BBB")],
            vec![player(10, 1, Position::Forward)],
            vec![
                game("g1", 2024, 11, 1, 1, 2),
                game("g2", 2024, 11, 3, 2, 1),
                game("g3", 2024, 11, 4, 1, 2),
            ],
            vec![
                scoring_row("g1", 10, 1, 2, 10),
                scoring_row("g2", 10, 1, 2, 20),
                scoring_row("g3", 10, 1, 2, 60),
            ],
        );

        let rows = feature_history(&snapshot, &FeatureConfig::default(), &ScoringConfig::default());
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].fp_last_5, None);
        assert_eq!(rows[0].days_rest, None);

        assert_eq!(rows[1].fantasy_points, 20.0);
        assert_eq!(rows[1].fp_last_5, Some(10.0));
        assert_eq!(rows[1].days_rest, Some(2));

        assert_eq!(rows[2].fp_window, Some(15.0));
        assert_eq!(rows[2].minutes_last_5, Some(30.0));
        assert_eq!(rows[2].days_rest, Some(1));
    }

    #[test]
    fn test_last_five_window() {
        let mut games = Vec::new();
        let mut rows = Vec::new();
        for i in 0..7u32 {
            let id = format!("g{}", i);
            games.push(game(&id, 2024, 11, 1 + i, 1, 2));
            rows.push(scoring_row(&id, 10, 1, 2, (i as u16 + 1) * 10));
        }
        let snapshot = Snapshot::new(
            vec![team(1, "AAA"), team(2, "BBB")],
            vec![player(10, 1, Position::Forward)],
            games,
            rows,
        );

        let history = feature_history(&snapshot, &FeatureConfig::default(), &ScoringConfig::default());
        let last = history.last().unwrap();
        // Prior games score 10..60; last five are 20..60
        assert_eq!(last.fp_last_5, Some(40.0));
        assert_eq!(last.fp_window, Some(35.0));
    }

    #[test]
    fn test_history_matches_engine_under_custom_config() {
        let snapshot = Snapshot::new(
            vec![team(1, "AAA"), team(2, "BBB")],
            vec![player(10, 1, Position::Forward)],
            vec![
                game("g1", 2024, 11, 1, 1, 2),
                game("g2", 2024, 11, 2, 1, 2),
                game("g3", 2024, 11, 3, 1, 2),
                game("g4", 2024, 11, 4, 1, 2),
                game("g5", 2024, 11, 5, 1, 2),
            ],
            vec![
                scoring_row("g1", 10, 1, 2, 40),
                scoring_row("g2", 10, 1, 2, 10),
                {
                    let mut short = scoring_row("g3", 10, 1, 2, 50);
                    short.minutes = 2.0;
                    short
                },
                scoring_row("g4", 10, 1, 2, 20),
                scoring_row("g5", 10, 1, 2, 90),
            ],
        );
        let mut config = Config::default();
        config.features.window = 2;
        config.features.min_minutes = 5.0;

        let rows = feature_history(&snapshot, &config.features, &config.scoring);
        let engine = FeatureEngine::new(&snapshot, &config);

        for row in &rows {
            assert_eq!(
                row.fp_window,
                engine.fppg(row.player_id, row.game_date).ok(),
                "{}",
                row.game_id
            );
        }

        // The 2-minute game is skipped: before g4 the window is g1, g2
        let g4 = rows.iter().find(|r| r.game_id == GameId::from("g4")).unwrap();
        assert_eq!(g4.fp_window, Some(25.0));
        assert_eq!(g4.fp_last_5, Some(25.0));
        assert_eq!(g4.days_rest, Some(1));

        // Before g5: g2 and g4
        let g5 = rows.iter().find(|r| r.game_id == GameId::from("g5")).unwrap();
        assert_eq!(g5.fp_window, Some(15.0));
    }
}
