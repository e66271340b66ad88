//! Defense vs. position
//!
//! How many fantasy points a team gives up to each position, relative to the
//! league. A factor above 1.0 marks a softer matchup.

use crate::data::Snapshot;
use crate::{FeatureConfig, Position, ScoringConfig, TeamId};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Matchup factor for one opponent and position
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DvpFactor {
    pub factor: f64,
    /// Opponent games that contributed to the factor
    pub sample_games: usize,
    /// True when the factor fell back to neutral
    pub low_confidence: bool,
}

impl DvpFactor {
    pub fn neutral(sample_games: usize) -> Self {
        DvpFactor {
            factor: 1.0,
            sample_games,
            low_confidence: true,
        }
    }
}

/// Accumulated points allowed across sampled games
#[derive(Debug, Clone, Copy, Default)]
struct Allowance {
    total: f64,
    games: usize,
}

impl Allowance {
    fn add(&mut self, points: f64) {
        self.total += points;
        self.games += 1;
    }

    fn per_game(&self) -> Option<f64> {
        if self.games == 0 {
            None
        } else {
            Some(self.total / self.games as f64)
        }
    }
}

/// Points allowed per team and position as of a date
#[derive(Debug, Clone)]
pub struct DefenseVsPosition {
    as_of: NaiveDate,
    min_games: usize,
    teams: BTreeMap<(TeamId, Position), Allowance>,
    league: BTreeMap<Position, Allowance>,
}

impl DefenseVsPosition {
    /// Tally every team's last `dvp_window` defended games before `as_of`.
    ///
    /// A game counts toward a position's sample when at least one opposing
    /// player at that position logged a row; the sample value is the sum of
    /// their fantasy points.
    pub fn build(
        snapshot: &Snapshot,
        as_of: NaiveDate,
        config: &FeatureConfig,
        scoring: &ScoringConfig,
    ) -> Self {
        let mut teams: BTreeMap<(TeamId, Position), Allowance> = BTreeMap::new();
        let mut league: BTreeMap<Position, Allowance> = BTreeMap::new();

        for team in snapshot.defending_teams() {
            for game in snapshot.games_defended_before(team, as_of, config.dvp_window) {
                for position in Position::ALL {
                    let mut rows = snapshot.allowed_rows(game, position).peekable();
                    if rows.peek().is_none() {
                        continue;
                    }
                    let points: f64 = rows.map(|row| scoring.fantasy_points(row)).sum();
                    teams.entry((team, position)).or_default().add(points);
                    league.entry(position).or_default().add(points);
                }
            }
        }

        log::debug!(
            "Built defense-vs-position table for {} ({} team/position samples)",
            as_of,
            teams.len()
        );

        DefenseVsPosition {
            as_of,
            min_games: config.dvp_min_games,
            teams,
            league,
        }
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Average fantasy points a team allows to a position
    pub fn allowed_per_game(&self, team: TeamId, position: Position) -> Option<f64> {
        self.teams.get(&(team, position)).and_then(|a| a.per_game())
    }

    /// League-wide average fantasy points allowed to a position
    pub fn league_per_game(&self, position: Position) -> Option<f64> {
        self.league.get(&position).and_then(|a| a.per_game())
    }

    /// Factor for facing `opponent` at `position`. Falls back to a flagged
    /// neutral 1.0 when the opponent's sample is below the minimum or the
    /// league baseline is zero.
    pub fn factor(&self, opponent: TeamId, position: Position) -> DvpFactor {
        let allowance = self
            .teams
            .get(&(opponent, position))
            .copied()
            .unwrap_or_default();

        if allowance.games < self.min_games {
            return DvpFactor::neutral(allowance.games);
        }

        let team_avg = match allowance.per_game() {
            Some(avg) => avg,
            None => return DvpFactor::neutral(0),
        };
        let league_avg = match self.league_per_game(position) {
            Some(avg) if avg > 0.0 => avg,
            _ => return DvpFactor::neutral(allowance.games),
        };

        let factor = team_avg / league_avg;
        if !factor.is_finite() || factor < 0.0 {
            return DvpFactor::neutral(allowance.games);
        }

        DvpFactor {
            factor,
            sample_games: allowance.games,
            low_confidence: false,
        }
    }
}
