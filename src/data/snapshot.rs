//! Immutable in-memory view of the relational store
//!
//! Everything the feature engine reads comes from a [`Snapshot`], so feature
//! computation never touches the database or the network.

use crate::{BoxscoreRow, Game, GameId, Player, PlayerId, Position, Team, TeamId};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// A box score row joined with its game date
#[derive(Debug, Clone, PartialEq)]
pub struct DatedBoxscore {
    pub date: NaiveDate,
    pub row: BoxscoreRow,
}

/// Rows a team allowed in a single game
#[derive(Debug, Clone)]
pub struct AllowedGame {
    pub date: NaiveDate,
    pub game_id: GameId,
    /// Indexes into the snapshot rows
    rows: Vec<usize>,
}

/// Point-in-time copy of teams, players, games and box scores
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    teams: BTreeMap<TeamId, Team>,
    players: BTreeMap<PlayerId, Player>,
    games: BTreeMap<GameId, Game>,
    /// Ordered by (date, game id, player id)
    rows: Vec<DatedBoxscore>,
    /// Row indexes per player, chronological
    by_player: HashMap<PlayerId, Vec<usize>>,
    /// Games per defending team, chronological
    allowed: BTreeMap<TeamId, Vec<AllowedGame>>,
    rejected: usize,
}

impl Snapshot {
    /// Build a snapshot, dropping rows whose references cannot be resolved.
    pub fn new(
        teams: Vec<Team>,
        players: Vec<Player>,
        games: Vec<Game>,
        boxscores: Vec<BoxscoreRow>,
    ) -> Self {
        let teams: BTreeMap<_, _> = teams.into_iter().map(|t| (t.id, t)).collect();
        let mut rejected = 0;

        let mut player_map = BTreeMap::new();
        for mut player in players {
            if let Some(team) = player.team {
                if !teams.contains_key(&team) {
                    log::warn!(
                        "{} ({}) references unknown {}; treating as unassigned",
                        player.name,
                        player.id,
                        team
                    );
                    player.team = None;
                }
            }
            player_map.insert(player.id, player);
        }

        let mut game_map = BTreeMap::new();
        for game in games {
            if !teams.contains_key(&game.home_team) || !teams.contains_key(&game.away_team) {
                log::warn!("Skipping {}: unknown team reference", game.id);
                rejected += 1;
                continue;
            }
            game_map.insert(game.id.clone(), game);
        }

        let mut rows = Vec::with_capacity(boxscores.len());
        for row in boxscores {
            let game = match game_map.get(&row.game_id) {
                Some(game) => game,
                None => {
                    log::warn!("Skipping box score for {}: unknown {}", row.player_id, row.game_id);
                    rejected += 1;
                    continue;
                }
            };
            if !player_map.contains_key(&row.player_id) {
                log::warn!("Skipping box score in {}: unknown {}", row.game_id, row.player_id);
                rejected += 1;
                continue;
            }
            if !teams.contains_key(&row.team_id) || !teams.contains_key(&row.opponent_team_id) {
                log::warn!(
                    "Skipping box score for {} in {}: unknown team",
                    row.player_id,
                    row.game_id
                );
                rejected += 1;
                continue;
            }
            rows.push(DatedBoxscore {
                date: game.date,
                row,
            });
        }

        rows.sort_by(|a, b| {
            (a.date, &a.row.game_id, a.row.player_id).cmp(&(b.date, &b.row.game_id, b.row.player_id))
        });
        rows.dedup_by(|a, b| a.row.game_id == b.row.game_id && a.row.player_id == b.row.player_id);

        let mut by_player: HashMap<PlayerId, Vec<usize>> = HashMap::new();
        let mut allowed: BTreeMap<TeamId, Vec<AllowedGame>> = BTreeMap::new();
        for (idx, dated) in rows.iter().enumerate() {
            by_player.entry(dated.row.player_id).or_default().push(idx);

            let games = allowed.entry(dated.row.opponent_team_id).or_default();
            match games.last_mut() {
                Some(last) if last.game_id == dated.row.game_id => last.rows.push(idx),
                _ => games.push(AllowedGame {
                    date: dated.date,
                    game_id: dated.row.game_id.clone(),
                    rows: vec![idx],
                }),
            }
        }

        if rejected > 0 {
            log::warn!("Snapshot dropped {} rows with unresolved references", rejected);
        }

        Snapshot {
            teams,
            players: player_map,
            games: game_map,
            rows,
            by_player,
            allowed,
            rejected,
        }
    }

    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.get(&id)
    }

    /// Find a team by name or abbreviation
    pub fn find_team(&self, name: &str) -> Option<&Team> {
        self.teams.values().find(|t| t.matches_name(name))
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Find a player by id or name
    pub fn find_player(&self, key: &str) -> Option<&Player> {
        self.players.values().find(|p| p.matches(key))
    }

    /// Players in id order
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Rows dropped while building the snapshot
    pub fn rejected_count(&self) -> usize {
        self.rejected
    }

    /// All rows in (date, game, player) order
    pub fn rows(&self) -> &[DatedBoxscore] {
        &self.rows
    }

    /// Games played on a date, ordered by id
    pub fn games_on(&self, date: NaiveDate) -> Vec<&Game> {
        self.games.values().filter(|g| g.date == date).collect()
    }

    /// The team a given team faces on a date, if it plays
    pub fn opponent_on(&self, team: TeamId, date: NaiveDate) -> Option<TeamId> {
        self.games
            .values()
            .find(|g| g.date == date && g.involves(team))
            .and_then(|g| g.opponent(team))
    }

    /// A player's rows strictly before `as_of`, oldest first
    pub fn player_games_before(&self, player: PlayerId, as_of: NaiveDate) -> Vec<&DatedBoxscore> {
        self.by_player
            .get(&player)
            .map(|idxs| {
                idxs.iter()
                    .map(|&i| &self.rows[i])
                    .take_while(|r| r.date < as_of)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Teams that have defended at least one recorded game
    pub fn defending_teams(&self) -> impl Iterator<Item = TeamId> + '_ {
        self.allowed.keys().copied()
    }

    /// The last `window` games a team defended strictly before `as_of`,
    /// oldest first
    pub fn games_defended_before(
        &self,
        team: TeamId,
        as_of: NaiveDate,
        window: usize,
    ) -> &[AllowedGame] {
        let games = match self.allowed.get(&team) {
            Some(games) => games.as_slice(),
            None => return &[],
        };
        let end = games.partition_point(|g| g.date < as_of);
        &games[end.saturating_sub(window)..end]
    }

    /// Rows an opponent produced in a defended game, restricted to a position
    pub fn allowed_rows<'a>(
        &'a self,
        game: &'a AllowedGame,
        position: Position,
    ) -> impl Iterator<Item = &'a BoxscoreRow> + 'a {
        game.rows.iter().map(move |&i| &self.rows[i].row).filter(move |row| {
            self.players
                .get(&row.player_id)
                .map(|p| p.position == position)
                .unwrap_or(false)
        })
    }
}
