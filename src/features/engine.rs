//! Per-player feature computation
//!
//! Turns a player's box score history into the three inputs of the forecast
//! formula. Every method is a pure function of the snapshot, the player, the
//! as-of date and the configuration.

use crate::data::Snapshot;
use crate::features::consistency::consistency_from_scores;
use crate::features::dvp::{DefenseVsPosition, DvpFactor};
use crate::features::rolling::RollingWindow;
use crate::{Config, FeatureConfig, NbaError, Player, PlayerId, Position, Result, ScoringConfig, TeamId};
use chrono::NaiveDate;
use serde::Serialize;

/// Derived features for one player against one opponent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRecord {
    pub player: PlayerId,
    pub as_of: NaiveDate,
    pub opponent: TeamId,
    pub position: Position,
    /// Mean fantasy points over the trailing window
    pub fppg: f64,
    /// 0-100, higher is steadier
    pub consistency: f64,
    pub dvp: DvpFactor,
    pub games_used: usize,
    pub avg_minutes: f64,
    /// Days since the player's last appearance
    pub days_rest: Option<i64>,
}

/// Computes feature records from an immutable snapshot
pub struct FeatureEngine<'a> {
    snapshot: &'a Snapshot,
    features: FeatureConfig,
    scoring: ScoringConfig,
}

impl<'a> FeatureEngine<'a> {
    pub fn new(snapshot: &'a Snapshot, config: &Config) -> Self {
        FeatureEngine {
            snapshot,
            features: config.features.clone(),
            scoring: config.scoring.clone(),
        }
    }

    pub fn snapshot(&self) -> &'a Snapshot {
        self.snapshot
    }

    /// The player's trailing window strictly before `as_of`
    pub fn window(&self, player: PlayerId, as_of: NaiveDate) -> RollingWindow {
        let history = self.snapshot.player_games_before(player, as_of);
        RollingWindow::trailing(
            &history,
            self.features.window,
            self.features.min_minutes,
            &self.scoring,
        )
    }

    /// Rolling fantasy points per game
    pub fn fppg(&self, player: PlayerId, as_of: NaiveDate) -> Result<f64> {
        self.window(player, as_of)
            .mean_fantasy_points()
            .ok_or(NbaError::InsufficientHistory { player, as_of })
    }

    /// Consistency score over the same window as [`Self::fppg`]
    pub fn consistency(&self, player: PlayerId, as_of: NaiveDate) -> Result<f64> {
        let window = self.window(player, as_of);
        if window.is_empty() {
            return Err(NbaError::InsufficientHistory { player, as_of });
        }
        consistency_from_scores(&window.scores()).ok_or(NbaError::UndefinedConsistency { player })
    }

    /// Defense-vs-position table for a date, shared across players
    pub fn dvp_table(&self, as_of: NaiveDate) -> DefenseVsPosition {
        DefenseVsPosition::build(self.snapshot, as_of, &self.features, &self.scoring)
    }

    /// Full feature record, building the DvP table on the fly
    pub fn compute(&self, player: &Player, opponent: TeamId, as_of: NaiveDate) -> Result<FeatureRecord> {
        let dvp = self.dvp_table(as_of);
        self.compute_with(player, opponent, as_of, &dvp)
    }

    /// Full feature record against a prebuilt DvP table for the same date
    pub fn compute_with(
        &self,
        player: &Player,
        opponent: TeamId,
        as_of: NaiveDate,
        dvp: &DefenseVsPosition,
    ) -> Result<FeatureRecord> {
        debug_assert_eq!(dvp.as_of(), as_of);

        let history = self.snapshot.player_games_before(player.id, as_of);
        let window = RollingWindow::trailing(
            &history,
            self.features.window,
            self.features.min_minutes,
            &self.scoring,
        );
        let fppg = window
            .mean_fantasy_points()
            .ok_or(NbaError::InsufficientHistory {
                player: player.id,
                as_of,
            })?;
        let consistency = consistency_from_scores(&window.scores())
            .ok_or(NbaError::UndefinedConsistency { player: player.id })?;
        let avg_minutes = window.mean_minutes().unwrap_or(0.0);
        // Any appearance counts as rest-breaking, even one below min_minutes
        let days_rest = history.last().map(|last| (as_of - last.date).num_days());

        Ok(FeatureRecord {
            player: player.id,
            as_of,
            opponent,
            position: player.position,
            fppg,
            consistency,
            dvp: dvp.factor(opponent, player.position),
            games_used: window.len(),
            avg_minutes,
            days_rest,
        })
    }
}
