//! NBA player forecasting from box score history
//!
//! Loads a relational snapshot of teams, players, games and box scores,
//! derives rolling fantasy features per player and combines them into a
//! single forecast number per player for a slate of games.

pub mod data;
pub mod features;
pub mod output;
pub mod predict;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Unique identifier for a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamId(pub i64);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Team({})", self.0)
    }
}

/// Unique identifier for a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub i64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Player({})", self.0)
    }
}

/// Provider game identifier (kept as text, ids carry leading zeros)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GameId(pub String);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Game({})", self.0)
    }
}

impl From<&str> for GameId {
    fn from(id: &str) -> Self {
        GameId(id.to_string())
    }
}

/// Primary playing position
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Position {
    Guard,
    Forward,
    Center,
}

impl Position {
    pub const ALL: [Position; 3] = [Position::Guard, Position::Forward, Position::Center];

    pub fn code(&self) -> &'static str {
        match self {
            Position::Guard => "G",
            Position::Forward => "F",
            Position::Center => "C",
        }
    }

    /// Parse a provider position code. Hyphenated codes such as `G-F` resolve
    /// to their first component.
    pub fn from_code(code: &str) -> Option<Self> {
        let primary = code
            .split(|c| c == '-' || c == '/')
            .next()
            .unwrap_or_default()
            .trim()
            .to_uppercase();

        match primary.as_str() {
            "G" | "PG" | "SG" | "GUARD" => Some(Position::Guard),
            "F" | "SF" | "PF" | "FORWARD" => Some(Position::Forward),
            "C" | "CENTER" => Some(Position::Center),
            _ => None,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Guard => write!(f, "Guard"),
            Position::Forward => write!(f, "Forward"),
            Position::Center => write!(f, "Center"),
        }
    }
}

/// An NBA team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub abbreviation: String,
    pub conference: Option<String>,
    pub division: Option<String>,
}

impl Team {
    pub fn matches_name(&self, name: &str) -> bool {
        let name_lower = name.to_lowercase();
        self.name.to_lowercase() == name_lower || self.abbreviation.to_lowercase() == name_lower
    }
}

/// A player and their current roster assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// None while the player is between teams
    pub team: Option<TeamId>,
    pub position: Position,
}

impl Player {
    /// Match by exact id or case-insensitive name
    pub fn matches(&self, key: &str) -> bool {
        match key.trim().parse::<i64>() {
            Ok(id) => self.id.0 == id,
            Err(_) => self.name.to_lowercase() == key.trim().to_lowercase(),
        }
    }
}

/// A scheduled or completed game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub date: NaiveDate,
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub season: String,
}

impl Game {
    /// Check whether a team plays in this game
    pub fn involves(&self, team: TeamId) -> bool {
        self.home_team == team || self.away_team == team
    }

    /// Get the opponent for a given team
    pub fn opponent(&self, team: TeamId) -> Option<TeamId> {
        if team == self.home_team {
            Some(self.away_team)
        } else if team == self.away_team {
            Some(self.home_team)
        } else {
            None
        }
    }
}

/// One player's statistics for one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxscoreRow {
    pub game_id: GameId,
    pub player_id: PlayerId,
    pub team_id: TeamId,
    pub opponent_team_id: TeamId,
    pub minutes: f64,
    pub points: u16,
    pub rebounds: u16,
    pub assists: u16,
    pub steals: u16,
    pub blocks: u16,
    pub turnovers: u16,
    pub fgm: u16,
    pub fga: u16,
    pub fg3m: u16,
    pub fg3a: u16,
    pub ftm: u16,
    pub fta: u16,
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum NbaError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown team: {0}")]
    UnknownTeam(String),

    #[error("Unknown player: {0}")]
    UnknownPlayer(String),

    #[error("Box score for {player} in {game} references unknown {entity}")]
    MissingReference {
        game: GameId,
        player: PlayerId,
        entity: &'static str,
    },

    #[error("Required table missing: {0} - run `nba data import` first")]
    MissingTable(String),

    #[error("Insufficient history for {player}: no qualifying games before {as_of}")]
    InsufficientHistory { player: PlayerId, as_of: NaiveDate },

    #[error("Consistency undefined for {player}: mean fantasy score is not positive")]
    UndefinedConsistency { player: PlayerId },

    #[error("Invalid forecast input {name}: {value}")]
    InvalidInput { name: &'static str, value: f64 },

    #[error("No player produced a forecast for {0}")]
    NoForecasts(NaiveDate),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, NbaError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub data: DataConfig,
}

/// Fantasy point weights per counting stat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub points: f64,
    pub rebounds: f64,
    pub assists: f64,
    pub steals: f64,
    pub blocks: f64,
    pub turnovers: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            points: 1.0,
            rebounds: 1.2,
            assists: 1.5,
            steals: 3.0,
            blocks: 3.0,
            turnovers: -1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Player games in the rolling window
    pub window: usize,
    /// Team games in the defense-vs-position window
    pub dvp_window: usize,
    /// Minimum team games per position before DvP is trusted
    pub dvp_min_games: usize,
    /// Rows below this many minutes are left out of the player window
    pub min_minutes: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        FeatureConfig {
            window: 10,
            dvp_window: 20,
            dvp_min_games: 5,
            min_minutes: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    pub output_path: String,
    pub history_path: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            database_path: "data/nba_forecasting.db".to_string(),
            output_path: "outputs/forecast.csv".to_string(),
            history_path: "outputs/features.csv".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            NbaError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| NbaError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| NbaError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.features.window == 0 {
            return Err(NbaError::Config("features.window must be at least 1".into()));
        }
        if self.features.dvp_window == 0 {
            return Err(NbaError::Config("features.dvp_window must be at least 1".into()));
        }
        let weights = [
            self.scoring.points,
            self.scoring.rebounds,
            self.scoring.assists,
            self.scoring.steals,
            self.scoring.blocks,
            self.scoring.turnovers,
        ];
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(NbaError::Config("scoring weights must be finite".into()));
        }
        if !self.features.min_minutes.is_finite() || self.features.min_minutes < 0.0 {
            return Err(NbaError::Config(
                "features.min_minutes must be a non-negative number".into(),
            ));
        }
        Ok(())
    }
}
