//! SQLite database management for NBA statistics

use crate::data::Snapshot;
use crate::{
    BoxscoreRow, Game, GameId, NbaError, Player, PlayerId, Position, Result, Team, TeamId,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const REQUIRED_TABLES: [&str; 4] = ["teams", "players", "games", "boxscores"];

/// Outcome of inserting a single box score row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Row for this (game, player) already stored; box scores are append-only
    Duplicate,
}

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Open an existing database without creating tables.
    ///
    /// Fails with [`NbaError::MissingTable`] when the store was never
    /// populated, which is the only fatal input condition for a forecast run.
    pub fn open_existing<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(NbaError::MissingTable(format!(
                "{} (database file not found)",
                path.display()
            )));
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Database { conn };
        db.check_tables()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS teams (
                team_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                abbreviation TEXT NOT NULL UNIQUE,
                conference TEXT,
                division TEXT
            );

            CREATE TABLE IF NOT EXISTS players (
                player_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                team_id INTEGER REFERENCES teams(team_id),
                position TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS games (
                game_id TEXT PRIMARY KEY,
                game_date TEXT NOT NULL,
                season TEXT NOT NULL,
                home_team_id INTEGER NOT NULL REFERENCES teams(team_id),
                away_team_id INTEGER NOT NULL REFERENCES teams(team_id)
            );

            CREATE TABLE IF NOT EXISTS boxscores (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                game_id TEXT NOT NULL REFERENCES games(game_id),
                player_id INTEGER NOT NULL REFERENCES players(player_id),
                team_id INTEGER NOT NULL REFERENCES teams(team_id),
                opponent_team_id INTEGER NOT NULL REFERENCES teams(team_id),
                minutes REAL NOT NULL DEFAULT 0,
                points INTEGER NOT NULL DEFAULT 0,
                rebounds INTEGER NOT NULL DEFAULT 0,
                assists INTEGER NOT NULL DEFAULT 0,
                steals INTEGER NOT NULL DEFAULT 0,
                blocks INTEGER NOT NULL DEFAULT 0,
                turnovers INTEGER NOT NULL DEFAULT 0,
                fgm INTEGER NOT NULL DEFAULT 0,
                fga INTEGER NOT NULL DEFAULT 0,
                fg3m INTEGER NOT NULL DEFAULT 0,
                fg3a INTEGER NOT NULL DEFAULT 0,
                ftm INTEGER NOT NULL DEFAULT 0,
                fta INTEGER NOT NULL DEFAULT 0,
                UNIQUE(game_id, player_id)
            );

            CREATE INDEX IF NOT EXISTS idx_games_date ON games(game_date);
            CREATE INDEX IF NOT EXISTS idx_boxscores_player ON boxscores(player_id);
            CREATE INDEX IF NOT EXISTS idx_boxscores_opponent ON boxscores(opponent_team_id);
            "#,
        )?;
        Ok(())
    }

    /// Run `f` inside a transaction, rolling back if it fails
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
    {
        self.conn.execute_batch("BEGIN")?;
        match f(self) {
            Ok(value) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(value)
            }
            Err(e) => {
                self.conn.execute_batch("ROLLBACK")?;
                Err(e)
            }
        }
    }

    /// Verify every required table exists
    pub fn check_tables(&self) -> Result<()> {
        for table in REQUIRED_TABLES {
            let found: Option<String> = self
                .conn
                .query_row(
                    "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    params![table],
                    |row| row.get(0),
                )
                .optional()?;
            if found.is_none() {
                return Err(NbaError::MissingTable(table.to_string()));
            }
        }
        Ok(())
    }

    // ==================== Team Operations ====================

    /// Insert a team or refresh its descriptive fields
    pub fn upsert_team(&self, team: &Team) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO teams (team_id, name, abbreviation, conference, division)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(team_id) DO UPDATE SET
                name = excluded.name,
                abbreviation = excluded.abbreviation,
                conference = COALESCE(excluded.conference, conference),
                division = COALESCE(excluded.division, division)
            "#,
            params![
                team.id.0,
                team.name,
                team.abbreviation,
                team.conference,
                team.division
            ],
        )?;
        Ok(())
    }

    /// Find a team by name or abbreviation
    pub fn find_team(&self, name: &str) -> Result<Option<Team>> {
        Ok(self
            .get_all_teams()?
            .into_iter()
            .find(|team| team.matches_name(name)))
    }

    pub fn team_exists(&self, id: TeamId) -> Result<bool> {
        self.exists("SELECT 1 FROM teams WHERE team_id = ?1", id.0)
    }

    /// Get all teams
    pub fn get_all_teams(&self) -> Result<Vec<Team>> {
        let mut stmt = self.conn.prepare(
            "SELECT team_id, name, abbreviation, conference, division FROM teams ORDER BY team_id",
        )?;

        let teams = stmt
            .query_map([], |row| {
                Ok(Team {
                    id: TeamId(row.get(0)?),
                    name: row.get(1)?,
                    abbreviation: row.get(2)?,
                    conference: row.get(3)?,
                    division: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(teams)
    }

    // ==================== Player Operations ====================

    /// Insert a player or update their roster assignment. Players are never
    /// deleted.
    pub fn upsert_player(&self, player: &Player) -> Result<()> {
        if let Some(team) = player.team {
            if !self.team_exists(team)? {
                return Err(NbaError::UnknownTeam(team.to_string()));
            }
        }
        self.conn.execute(
            r#"
            INSERT INTO players (player_id, name, team_id, position)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(player_id) DO UPDATE SET
                name = excluded.name,
                team_id = excluded.team_id,
                position = excluded.position
            "#,
            params![
                player.id.0,
                player.name,
                player.team.map(|t| t.0),
                player.position.code()
            ],
        )?;
        Ok(())
    }

    pub fn player_exists(&self, id: PlayerId) -> Result<bool> {
        self.exists("SELECT 1 FROM players WHERE player_id = ?1", id.0)
    }

    /// Get all players
    pub fn get_all_players(&self) -> Result<Vec<Player>> {
        let mut stmt = self
            .conn
            .prepare("SELECT player_id, name, team_id, position FROM players ORDER BY player_id")?;

        let rows = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                let name: String = row.get(1)?;
                let team: Option<i64> = row.get(2)?;
                let position: String = row.get(3)?;
                Ok((id, name, team, position))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, name, team, position)| {
                let position = Position::from_code(&position).ok_or_else(|| {
                    NbaError::Parse(format!("Unknown position '{}' for player {}", position, id))
                })?;
                Ok(Player {
                    id: PlayerId(id),
                    name,
                    team: team.map(TeamId),
                    position,
                })
            })
            .collect()
    }

    // ==================== Game Operations ====================

    /// Insert a game. Games are immutable once stored, so a repeated id is a
    /// no-op. Returns true if the row was new.
    pub fn insert_game(&self, game: &Game) -> Result<bool> {
        for team in [game.home_team, game.away_team] {
            if !self.team_exists(team)? {
                return Err(NbaError::UnknownTeam(team.to_string()));
            }
        }
        let changed = self.conn.execute(
            r#"
            INSERT INTO games (game_id, game_date, season, home_team_id, away_team_id)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(game_id) DO NOTHING
            "#,
            params![
                game.id.0,
                game.date.format("%Y-%m-%d").to_string(),
                game.season,
                game.home_team.0,
                game.away_team.0
            ],
        )?;
        Ok(changed > 0)
    }

    /// Home and away team of a stored game
    pub fn game_teams(&self, id: &GameId) -> Result<Option<(TeamId, TeamId)>> {
        let teams = self
            .conn
            .query_row(
                "SELECT home_team_id, away_team_id FROM games WHERE game_id = ?1",
                params![id.0],
                |row| Ok((TeamId(row.get(0)?), TeamId(row.get(1)?))),
            )
            .optional()?;
        Ok(teams)
    }

    /// Get all games
    pub fn get_all_games(&self) -> Result<Vec<Game>> {
        self.query_games(
            "SELECT game_id, game_date, season, home_team_id, away_team_id
             FROM games ORDER BY game_date, game_id",
            [],
        )
    }

    /// Get games scheduled on a date
    pub fn get_games_on(&self, date: NaiveDate) -> Result<Vec<Game>> {
        self.query_games(
            "SELECT game_id, game_date, season, home_team_id, away_team_id
             FROM games WHERE game_date = ?1 ORDER BY game_id",
            params![date.format("%Y-%m-%d").to_string()],
        )
    }

    fn query_games<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Game>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, |row| {
                let id: String = row.get(0)?;
                let date: String = row.get(1)?;
                let season: String = row.get(2)?;
                let home: i64 = row.get(3)?;
                let away: i64 = row.get(4)?;
                Ok((id, date, season, home, away))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, date, season, home, away)| {
                let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| {
                    NbaError::Parse(format!("Bad date '{}' for game {}: {}", date, id, e))
                })?;
                Ok(Game {
                    id: GameId(id),
                    date,
                    home_team: TeamId(home),
                    away_team: TeamId(away),
                    season,
                })
            })
            .collect()
    }

    // ==================== Box Score Operations ====================

    /// Append a box score row after checking its references.
    ///
    /// Rows pointing at an unknown game, player or team are rejected with
    /// [`NbaError::MissingReference`]; callers log and continue.
    pub fn insert_boxscore(&self, row: &BoxscoreRow) -> Result<InsertOutcome> {
        let missing = |entity| NbaError::MissingReference {
            game: row.game_id.clone(),
            player: row.player_id,
            entity,
        };
        let (home, away) = match self.game_teams(&row.game_id)? {
            Some(pair) => pair,
            None => return Err(missing("game")),
        };
        if !self.player_exists(row.player_id)? {
            return Err(missing("player"));
        }
        if !self.team_exists(row.team_id)? {
            return Err(missing("team"));
        }
        if !self.team_exists(row.opponent_team_id)? {
            return Err(missing("opponent team"));
        }
        let sides_match = (row.team_id == home && row.opponent_team_id == away)
            || (row.team_id == away && row.opponent_team_id == home);
        if !sides_match {
            return Err(missing("home/away pairing"));
        }

        let changed = self.conn.execute(
            r#"
            INSERT INTO boxscores (game_id, player_id, team_id, opponent_team_id,
                                   minutes, points, rebounds, assists, steals, blocks, turnovers,
                                   fgm, fga, fg3m, fg3a, ftm, fta)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            ON CONFLICT(game_id, player_id) DO NOTHING
            "#,
            params![
                row.game_id.0,
                row.player_id.0,
                row.team_id.0,
                row.opponent_team_id.0,
                row.minutes,
                row.points,
                row.rebounds,
                row.assists,
                row.steals,
                row.blocks,
                row.turnovers,
                row.fgm,
                row.fga,
                row.fg3m,
                row.fg3a,
                row.ftm,
                row.fta,
            ],
        )?;

        Ok(if changed > 0 {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::Duplicate
        })
    }

    /// Get all box score rows
    pub fn get_all_boxscores(&self) -> Result<Vec<BoxscoreRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT game_id, player_id, team_id, opponent_team_id, minutes,
                    points, rebounds, assists, steals, blocks, turnovers,
                    fgm, fga, fg3m, fg3a, ftm, fta
             FROM boxscores
             ORDER BY id",
        )?;

        let rows = stmt
            .query_map([], Self::row_to_boxscore)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn row_to_boxscore(row: &rusqlite::Row) -> rusqlite::Result<BoxscoreRow> {
        Ok(BoxscoreRow {
            game_id: GameId(row.get(0)?),
            player_id: PlayerId(row.get(1)?),
            team_id: TeamId(row.get(2)?),
            opponent_team_id: TeamId(row.get(3)?),
            minutes: row.get(4)?,
            points: row.get(5)?,
            rebounds: row.get(6)?,
            assists: row.get(7)?,
            steals: row.get(8)?,
            blocks: row.get(9)?,
            turnovers: row.get(10)?,
            fgm: row.get(11)?,
            fga: row.get(12)?,
            fg3m: row.get(13)?,
            fg3a: row.get(14)?,
            ftm: row.get(15)?,
            fta: row.get(16)?,
        })
    }

    // ==================== Snapshot ====================

    /// Materialize every table into an immutable in-memory snapshot
    pub fn load_snapshot(&self) -> Result<Snapshot> {
        let teams = self.get_all_teams()?;
        let players = self.get_all_players()?;
        let games = self.get_all_games()?;
        let boxscores = self.get_all_boxscores()?;
        log::info!(
            "Loaded {} teams, {} players, {} games, {} box score rows",
            teams.len(),
            players.len(),
            games.len(),
            boxscores.len()
        );
        Ok(Snapshot::new(teams, players, games, boxscores))
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 = self.conn.query_row(
                &format!("SELECT COUNT(*) FROM {}", table),
                [],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        };

        let min_date: Option<String> = self
            .conn
            .query_row("SELECT MIN(game_date) FROM games", [], |row| row.get(0))
            .optional()?
            .flatten();

        let max_date: Option<String> = self
            .conn
            .query_row("SELECT MAX(game_date) FROM games", [], |row| row.get(0))
            .optional()?
            .flatten();

        Ok(DatabaseStats {
            team_count: count("teams")?,
            player_count: count("players")?,
            game_count: count("games")?,
            boxscore_count: count("boxscores")?,
            earliest_game: min_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            latest_game: max_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        })
    }

    fn exists(&self, sql: &str, id: i64) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(sql, params![id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub team_count: usize,
    pub player_count: usize,
    pub game_count: usize,
    pub boxscore_count: usize,
    pub earliest_game: Option<NaiveDate>,
    pub latest_game: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(id: i64, abbr: &str) -> Team {
        Team {
            id: TeamId(id),
            name: format!("{} Team", abbr),
            abbreviation: abbr.to_string(),
            conference: Some("West".to_string()),
            division: None,
        }
    }

    fn seeded() -> Database {
        let db = Database::in_memory().unwrap();
        db.upsert_team(&team(1, "DEN")).unwrap();
        db.upsert_team(&team(2, "LAL")).unwrap();
        db.upsert_player(&Player {
            id: PlayerId(10),
            name: "Big Man".to_string(),
            team: Some(TeamId(1)),
            position: Position::Center,
        })
        .unwrap();
        db.insert_game(&Game {
            id: GameId::from("0022400001"),
            date: NaiveDate::from_ymd_opt(2024, 10, 24).unwrap(),
            home_team: TeamId(1),
            away_team: TeamId(2),
            season: "2024-25".to_string(),
        })
        .unwrap();
        db
    }

    fn row(game: &str, player: i64) -> BoxscoreRow {
        BoxscoreRow {
            game_id: GameId::from(game),
            player_id: PlayerId(player),
            team_id: TeamId(1),
            opponent_team_id: TeamId(2),
            minutes: 34.5,
            points: 25,
            rebounds: 12,
            assists: 9,
            steals: 1,
            blocks: 1,
            turnovers: 3,
            fgm: 10,
            fga: 18,
            fg3m: 1,
            fg3a: 3,
            ftm: 4,
            fta: 5,
        }
    }

    #[test]
    fn test_create_database() {
        let db = Database::in_memory().unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.team_count, 0);
        assert_eq!(stats.boxscore_count, 0);
        assert!(stats.earliest_game.is_none());
        db.check_tables().unwrap();
    }

    #[test]
    fn test_player_update_keeps_single_row() {
        let db = seeded();
        db.upsert_player(&Player {
            id: PlayerId(10),
            name: "Big Man".to_string(),
            team: None,
            position: Position::Center,
        })
        .unwrap();

        let players = db.get_all_players().unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].team, None);
    }

    #[test]
    fn test_player_with_unknown_team_rejected() {
        let db = seeded();
        let result = db.upsert_player(&Player {
            id: PlayerId(11),
            name: "Nobody".to_string(),
            team: Some(TeamId(99)),
            position: Position::Guard,
        });
        assert!(matches!(result, Err(NbaError::UnknownTeam(_))));
    }

    #[test]
    fn test_game_is_immutable() {
        let db = seeded();
        let changed = db
            .insert_game(&Game {
                id: GameId::from("0022400001"),
                date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                home_team: TeamId(2),
                away_team: TeamId(1),
                season: "2024-25".to_string(),
            })
            .unwrap();
        assert!(!changed);

        let games = db.get_all_games().unwrap();
        assert_eq!(games[0].date, NaiveDate::from_ymd_opt(2024, 10, 24).unwrap());
        assert_eq!(games[0].home_team, TeamId(1));
    }

    #[test]
    fn test_insert_boxscore() {
        let db = seeded();
        assert_eq!(
            db.insert_boxscore(&row("0022400001", 10)).unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            db.insert_boxscore(&row("0022400001", 10)).unwrap(),
            InsertOutcome::Duplicate
        );

        let rows = db.get_all_boxscores().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], row("0022400001", 10));
    }

    #[test]
    fn test_boxscore_with_missing_reference_rejected() {
        let db = seeded();

        let err = db.insert_boxscore(&row("0022499999", 10)).unwrap_err();
        assert!(matches!(err, NbaError::MissingReference { entity: "game", .. }));

        let err = db.insert_boxscore(&row("0022400001", 77)).unwrap_err();
        assert!(matches!(err, NbaError::MissingReference { entity: "player", .. }));

        assert_eq!(db.get_stats().unwrap().boxscore_count, 0);
    }

    #[test]
    fn test_boxscore_teams_must_match_game() {
        let db = seeded();
        db.upsert_team(&team(3, "BOS")).unwrap();

        let mut wrong_opponent = row("0022400001", 10);
        wrong_opponent.opponent_team_id = TeamId(3);
        let err = db.insert_boxscore(&wrong_opponent).unwrap_err();
        assert!(matches!(
            err,
            NbaError::MissingReference {
                entity: "home/away pairing",
                ..
            }
        ));

        let mut same_side = row("0022400001", 10);
        same_side.opponent_team_id = TeamId(1);
        assert!(db.insert_boxscore(&same_side).is_err());

        // Away side is accepted as well
        let mut away = row("0022400001", 10);
        away.team_id = TeamId(2);
        away.opponent_team_id = TeamId(1);
        assert_eq!(db.insert_boxscore(&away).unwrap(), InsertOutcome::Inserted);

        assert_eq!(
            db.game_teams(&GameId::from("0022400001")).unwrap(),
            Some((TeamId(1), TeamId(2)))
        );
        assert_eq!(db.game_teams(&GameId::from("nope")).unwrap(), None);
    }

    #[test]
    fn test_games_on_date() {
        let db = seeded();
        let on = db
            .get_games_on(NaiveDate::from_ymd_opt(2024, 10, 24).unwrap())
            .unwrap();
        assert_eq!(on.len(), 1);
        let off = db
            .get_games_on(NaiveDate::from_ymd_opt(2024, 10, 25).unwrap())
            .unwrap();
        assert!(off.is_empty());
    }

    #[test]
    fn test_find_team_by_abbreviation() {
        let db = seeded();
        let found = db.find_team("lal").unwrap().unwrap();
        assert_eq!(found.id, TeamId(2));
        assert!(db.find_team("BOS").unwrap().is_none());
    }

    #[test]
    fn test_open_existing_requires_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("none.db");
        assert!(matches!(
            Database::open_existing(&missing),
            Err(NbaError::MissingTable(_))
        ));

        let path = dir.path().join("nba.db");
        Database::open(&path).unwrap();
        Database::open_existing(&path).unwrap();
    }

    #[test]
    fn test_open_existing_detects_missing_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE teams (team_id INTEGER PRIMARY KEY);")
            .unwrap();
        drop(conn);

        match Database::open_existing(&path) {
            Err(NbaError::MissingTable(table)) => assert_eq!(table, "players"),
            other => panic!("expected missing table, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_load_snapshot() {
        let db = seeded();
        db.insert_boxscore(&row("0022400001", 10)).unwrap();
        let snapshot = db.load_snapshot().unwrap();
        assert_eq!(snapshot.player_count(), 1);
        assert_eq!(snapshot.row_count(), 1);
    }
}
