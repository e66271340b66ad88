//! Slate forecasting
//!
//! Resolves the players on a date's slate, computes their features and
//! forecasts, and collects per-player exclusions instead of failing the run.

use crate::data::Snapshot;
use crate::features::{DefenseVsPosition, FeatureEngine};
use crate::predict::forecast::ForecastRecord;
use crate::{Config, NbaError, Player, PlayerId, Result, TeamId};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// Optional restriction of the roster to named players or teams
#[derive(Debug, Clone, Default)]
pub struct RosterFilter {
    /// Player ids or names
    pub players: Vec<String>,
    /// Team abbreviations or names
    pub teams: Vec<String>,
}

impl RosterFilter {
    pub fn is_empty(&self) -> bool {
        self.players.is_empty() && self.teams.is_empty()
    }

    fn admits(&self, snapshot: &Snapshot, player: &Player) -> bool {
        if self.is_empty() {
            return true;
        }
        if self.players.iter().any(|key| player.matches(key)) {
            return true;
        }
        player
            .team
            .and_then(|id| snapshot.team(id))
            .map(|team| self.teams.iter().any(|key| team.matches_name(key)))
            .unwrap_or(false)
    }
}

/// Why a player on the slate has no forecast
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExclusionReason {
    /// No qualifying games before the date
    InsufficientHistory,
    /// A zero or negative mean fantasy score leaves consistency undefined
    UndefinedConsistency,
    /// A feature value failed the forecast input checks
    InvalidInput(String),
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::InsufficientHistory => write!(f, "insufficient history"),
            ExclusionReason::UndefinedConsistency => write!(f, "undefined consistency"),
            ExclusionReason::InvalidInput(detail) => write!(f, "invalid input ({})", detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exclusion {
    pub player_id: PlayerId,
    pub player: String,
    pub reason: ExclusionReason,
}

/// Result of one forecast run
#[derive(Debug, Clone, Serialize)]
pub struct ForecastRun {
    pub date: NaiveDate,
    /// Sorted by forecast, highest first
    pub forecasts: Vec<ForecastRecord>,
    pub exclusions: Vec<Exclusion>,
}

impl ForecastRun {
    pub fn low_confidence_count(&self) -> usize {
        self.forecasts.iter().filter(|f| f.dvp_low_confidence).count()
    }
}

/// Runs the feature engine and combinator across a slate
pub struct Forecaster<'a> {
    engine: FeatureEngine<'a>,
}

impl<'a> Forecaster<'a> {
    pub fn new(snapshot: &'a Snapshot, config: &Config) -> Self {
        Forecaster {
            engine: FeatureEngine::new(snapshot, config),
        }
    }

    /// Forecast every admitted player whose team plays on `date`.
    ///
    /// Fails only when nobody on the slate produced a forecast.
    pub fn run(&self, date: NaiveDate, filter: &RosterFilter) -> Result<ForecastRun> {
        let snapshot = self.engine.snapshot();
        let slate = snapshot.games_on(date);
        if slate.is_empty() {
            log::warn!("No games scheduled on {}", date);
        } else {
            log::info!("Forecasting {} games on {}", slate.len(), date);
        }

        let dvp = self.engine.dvp_table(date);
        let mut forecasts = Vec::new();
        let mut exclusions = Vec::new();

        for player in snapshot.players() {
            if !filter.admits(snapshot, player) {
                continue;
            }
            let team = match player.team {
                Some(team) => team,
                None => {
                    log::debug!("{} has no current team, skipping", player.name);
                    continue;
                }
            };
            let opponent = match snapshot.opponent_on(team, date) {
                Some(opponent) => opponent,
                None => continue,
            };

            match self.forecast_with(player, Some(team), opponent, date, &dvp) {
                Ok(record) => forecasts.push(record),
                Err(e) => {
                    let reason = match e {
                        NbaError::InsufficientHistory { .. } => ExclusionReason::InsufficientHistory,
                        NbaError::UndefinedConsistency { .. } => {
                            ExclusionReason::UndefinedConsistency
                        }
                        NbaError::InvalidInput { name, value } => {
                            ExclusionReason::InvalidInput(format!("{} = {}", name, value))
                        }
                        other => return Err(other),
                    };
                    log::warn!("Excluding {} ({}): {}", player.name, player.id, reason);
                    exclusions.push(Exclusion {
                        player_id: player.id,
                        player: player.name.clone(),
                        reason,
                    });
                }
            }
        }

        if forecasts.is_empty() {
            return Err(NbaError::NoForecasts(date));
        }

        sort_forecasts(&mut forecasts);

        let run = ForecastRun {
            date,
            forecasts,
            exclusions,
        };
        log::info!(
            "Forecast {} players ({} low-confidence matchups, {} excluded)",
            run.forecasts.len(),
            run.low_confidence_count(),
            run.exclusions.len()
        );
        Ok(run)
    }

    /// Forecast a single player against a chosen opponent
    pub fn forecast_player(
        &self,
        player: &Player,
        opponent: TeamId,
        date: NaiveDate,
    ) -> Result<ForecastRecord> {
        let dvp = self.engine.dvp_table(date);
        self.forecast_with(player, player.team, opponent, date, &dvp)
    }

    pub fn engine(&self) -> &FeatureEngine<'a> {
        &self.engine
    }

    fn forecast_with(
        &self,
        player: &Player,
        team: Option<TeamId>,
        opponent: TeamId,
        date: NaiveDate,
        dvp: &DefenseVsPosition,
    ) -> Result<ForecastRecord> {
        let snapshot = self.engine.snapshot();
        let features = self.engine.compute_with(player, opponent, date, dvp)?;
        if features.dvp.low_confidence {
            log::debug!(
                "{}: low-confidence matchup vs {} ({} games)",
                player.name,
                opponent,
                features.dvp.sample_games
            );
        }
        ForecastRecord::from_features(
            &features,
            &player.name,
            &team.map(|t| abbreviation(snapshot, t)).unwrap_or_default(),
            &abbreviation(snapshot, opponent),
        )
    }
}

fn abbreviation(snapshot: &Snapshot, team: TeamId) -> String {
    snapshot
        .team(team)
        .map(|t| t.abbreviation.clone())
        .unwrap_or_default()
}

/// Forecast descending, then player name, then id
pub fn sort_forecasts(forecasts: &mut [ForecastRecord]) {
    forecasts.sort_by(|a, b| {
        b.forecast
            .total_cmp(&a.forecast)
            .then_with(|| a.player.cmp(&b.player))
            .then_with(|| a.player_id.cmp(&b.player_id))
    });
}
