//! CSV import of raw provider exports
//!
//! Loads `teams.csv`, `players.csv`, `games.csv` and `boxscores.csv` from a
//! directory into the store. A bad row is logged and counted, never fatal.

use crate::data::database::{Database, InsertOutcome};
use crate::{BoxscoreRow, Game, GameId, NbaError, Player, PlayerId, Position, Result, Team, TeamId};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Counts from one import run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub teams: usize,
    pub players: usize,
    pub games: usize,
    pub boxscores: usize,
    /// Rows already present (games and box scores are never rewritten)
    pub duplicates: usize,
    /// Rows that failed to parse or referenced unknown entities
    pub rejected: usize,
}

#[derive(Debug, Deserialize)]
struct RawTeam {
    #[serde(alias = "TEAM_ID")]
    team_id: i64,
    #[serde(alias = "full_name", alias = "TEAM_NAME")]
    name: String,
    #[serde(alias = "TEAM_ABBREVIATION")]
    abbreviation: String,
    #[serde(default)]
    conference: Option<String>,
    #[serde(default)]
    division: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPlayer {
    #[serde(alias = "PLAYER_ID")]
    player_id: i64,
    #[serde(alias = "full_name", alias = "PLAYER_NAME")]
    name: String,
    #[serde(default, alias = "TEAM_ID")]
    team_id: Option<i64>,
    #[serde(alias = "POSITION")]
    position: String,
}

#[derive(Debug, Deserialize)]
struct RawGame {
    #[serde(alias = "GAME_ID")]
    game_id: String,
    #[serde(alias = "GAME_DATE")]
    game_date: String,
    #[serde(default, alias = "SEASON")]
    season: String,
    home_team_id: i64,
    away_team_id: i64,
}

/// Counting stats are optional: provider DNP rows leave them blank
#[derive(Debug, Deserialize)]
struct RawBoxscore {
    #[serde(alias = "GAME_ID")]
    game_id: String,
    #[serde(alias = "PLAYER_ID")]
    player_id: i64,
    #[serde(alias = "TEAM_ID")]
    team_id: i64,
    #[serde(alias = "OPPONENT_TEAM_ID")]
    opponent_team_id: i64,
    #[serde(default, alias = "MIN")]
    minutes: Option<String>,
    #[serde(default, alias = "PTS")]
    points: Option<u16>,
    #[serde(default, alias = "REB")]
    rebounds: Option<u16>,
    #[serde(default, alias = "AST")]
    assists: Option<u16>,
    #[serde(default, alias = "STL")]
    steals: Option<u16>,
    #[serde(default, alias = "BLK")]
    blocks: Option<u16>,
    #[serde(default, alias = "TO", alias = "TOV")]
    turnovers: Option<u16>,
    #[serde(default, alias = "FGM")]
    fgm: Option<u16>,
    #[serde(default, alias = "FGA")]
    fga: Option<u16>,
    #[serde(default, alias = "FG3M")]
    fg3m: Option<u16>,
    #[serde(default, alias = "FG3A")]
    fg3a: Option<u16>,
    #[serde(default, alias = "FTM")]
    ftm: Option<u16>,
    #[serde(default, alias = "FTA")]
    fta: Option<u16>,
}

/// Parse a minutes field: `mm:ss`, plain or decimal minutes. Blank means the
/// player did not play.
pub fn parse_minutes(text: &str) -> Result<f64> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(0.0);
    }
    let bad = || NbaError::Parse(format!("Invalid minutes '{}'", text));

    let minutes = match text.split_once(':') {
        Some((mins, secs)) => {
            let mins: f64 = mins.trim().parse().map_err(|_| bad())?;
            let secs: f64 = secs.trim().parse().map_err(|_| bad())?;
            mins + secs / 60.0
        }
        None => text.parse().map_err(|_| bad())?,
    };

    if !minutes.is_finite() || minutes < 0.0 {
        return Err(bad());
    }
    Ok(minutes)
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    // Provider dates sometimes carry a time component
    let day = text.trim().get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| NbaError::Parse(format!("Invalid date '{}': {}", text, e)))
}

impl TryFrom<RawPlayer> for Player {
    type Error = NbaError;

    fn try_from(raw: RawPlayer) -> Result<Self> {
        let position = Position::from_code(&raw.position).ok_or_else(|| {
            NbaError::Parse(format!(
                "Unknown position '{}' for {}",
                raw.position, raw.name
            ))
        })?;
        Ok(Player {
            id: PlayerId(raw.player_id),
            name: raw.name.trim().to_string(),
            team: raw.team_id.map(TeamId),
            position,
        })
    }
}

impl TryFrom<RawGame> for Game {
    type Error = NbaError;

    fn try_from(raw: RawGame) -> Result<Self> {
        Ok(Game {
            id: GameId(raw.game_id.trim().to_string()),
            date: parse_date(&raw.game_date)?,
            home_team: TeamId(raw.home_team_id),
            away_team: TeamId(raw.away_team_id),
            season: raw.season.trim().to_string(),
        })
    }
}

impl TryFrom<RawBoxscore> for BoxscoreRow {
    type Error = NbaError;

    fn try_from(raw: RawBoxscore) -> Result<Self> {
        Ok(BoxscoreRow {
            game_id: GameId(raw.game_id.trim().to_string()),
            player_id: PlayerId(raw.player_id),
            team_id: TeamId(raw.team_id),
            opponent_team_id: TeamId(raw.opponent_team_id),
            minutes: parse_minutes(raw.minutes.as_deref().unwrap_or(""))?,
            points: raw.points.unwrap_or(0),
            rebounds: raw.rebounds.unwrap_or(0),
            assists: raw.assists.unwrap_or(0),
            steals: raw.steals.unwrap_or(0),
            blocks: raw.blocks.unwrap_or(0),
            turnovers: raw.turnovers.unwrap_or(0),
            fgm: raw.fgm.unwrap_or(0),
            fga: raw.fga.unwrap_or(0),
            fg3m: raw.fg3m.unwrap_or(0),
            fg3a: raw.fg3a.unwrap_or(0),
            ftm: raw.ftm.unwrap_or(0),
            fta: raw.fta.unwrap_or(0),
        })
    }
}

/// Loads raw CSV exports into a [`Database`]
pub struct Importer<'a> {
    db: &'a Database,
}

impl<'a> Importer<'a> {
    pub fn new(db: &'a Database) -> Self {
        Importer { db }
    }

    /// Import every known file found in `dir`, parents before children so
    /// foreign keys resolve.
    pub fn import_dir<P: AsRef<Path>>(&self, dir: P) -> Result<ImportReport> {
        let dir = dir.as_ref();
        let mut report = ImportReport::default();

        self.db.with_transaction(|_| {
            if let Some(file) = open_if_present(dir, "teams.csv")? {
                self.import_teams(file, &mut report)?;
            }
            if let Some(file) = open_if_present(dir, "players.csv")? {
                self.import_players(file, &mut report)?;
            }
            if let Some(file) = open_if_present(dir, "games.csv")? {
                self.import_games(file, &mut report)?;
            }
            if let Some(file) = open_if_present(dir, "boxscores.csv")? {
                self.import_boxscores(file, &mut report)?;
            }
            Ok(())
        })?;

        log::info!(
            "Imported {} teams, {} players, {} games, {} box scores ({} duplicates, {} rejected)",
            report.teams,
            report.players,
            report.games,
            report.boxscores,
            report.duplicates,
            report.rejected
        );
        Ok(report)
    }

    pub fn import_teams<R: Read>(&self, rdr: R, report: &mut ImportReport) -> Result<()> {
        for_each_row::<RawTeam, _, _>(rdr, "team", report, |raw, report| {
            let team = Team {
                id: TeamId(raw.team_id),
                name: raw.name.trim().to_string(),
                abbreviation: raw.abbreviation.trim().to_uppercase(),
                conference: raw.conference,
                division: raw.division,
            };
            self.db.upsert_team(&team)?;
            report.teams += 1;
            Ok(())
        })
    }

    pub fn import_players<R: Read>(&self, rdr: R, report: &mut ImportReport) -> Result<()> {
        for_each_row::<RawPlayer, _, _>(rdr, "player", report, |raw, report| {
            let player = Player::try_from(raw)?;
            self.db.upsert_player(&player)?;
            report.players += 1;
            Ok(())
        })
    }

    pub fn import_games<R: Read>(&self, rdr: R, report: &mut ImportReport) -> Result<()> {
        for_each_row::<RawGame, _, _>(rdr, "game", report, |raw, report| {
            let game = Game::try_from(raw)?;
            if self.db.insert_game(&game)? {
                report.games += 1;
            } else {
                report.duplicates += 1;
            }
            Ok(())
        })
    }

    pub fn import_boxscores<R: Read>(&self, rdr: R, report: &mut ImportReport) -> Result<()> {
        for_each_row::<RawBoxscore, _, _>(rdr, "box score", report, |raw, report| {
            let row = BoxscoreRow::try_from(raw)?;
            match self.db.insert_boxscore(&row)? {
                InsertOutcome::Inserted => report.boxscores += 1,
                InsertOutcome::Duplicate => report.duplicates += 1,
            }
            Ok(())
        })
    }
}

fn open_if_present(dir: &Path, name: &str) -> Result<Option<File>> {
    let path = dir.join(name);
    if !path.exists() {
        log::warn!("{} not found, skipping", path.display());
        return Ok(None);
    }
    Ok(Some(File::open(path)?))
}

/// Deserialize each record and hand it to `apply`. Parse failures and row
/// level errors are logged and counted as rejected; IO errors abort.
fn for_each_row<T, R, F>(rdr: R, kind: &str, report: &mut ImportReport, mut apply: F) -> Result<()>
where
    T: DeserializeOwned,
    R: Read,
    F: FnMut(T, &mut ImportReport) -> Result<()>,
{
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    for (line, result) in reader.deserialize::<T>().enumerate() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                log::warn!("Skipping malformed {} row {}: {}", kind, line + 1, e);
                report.rejected += 1;
                continue;
            }
        };
        match apply(raw, report) {
            Ok(()) => {}
            Err(NbaError::Io(e)) => return Err(NbaError::Io(e)),
            Err(e) => {
                log::warn!("Rejected {} row {}: {}", kind, line + 1, e);
                report.rejected += 1;
            }
        }
    }
    Ok(())
}
