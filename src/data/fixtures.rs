//! Test builders shared across module tests

use crate::{BoxscoreRow, Game, GameId, Player, PlayerId, Position, Team, TeamId};
use chrono::NaiveDate;

pub fn team(id: i64, abbr: &str) -> Team {
    Team {
        id: TeamId(id),
        name: format!("{} Club", abbr),
        abbreviation: abbr.to_string(),
        conference: None,
        division: None,
    }
}

pub fn player(id: i64, team: i64, position: Position) -> Player {
    Player {
        id: PlayerId(id),
        name: format!("Player {}", id),
        team: Some(TeamId(team)),
        position,
    }
}

pub fn game(id: &str, year: i32, month: u32, day: u32, home: i64, away: i64) -> Game {
    Game {
        id: GameId::from(id),
        date: NaiveDate::from_ymd_opt(year, month, day).unwrap(),
        home_team: TeamId(home),
        away_team: TeamId(away),
        season: "2024-25".to_string(),
    }
}

/// A row with the given scoring line and no steals, blocks or turnovers
pub fn boxscore(
    game: &str,
    player: i64,
    team: i64,
    opponent: i64,
    points: u16,
    rebounds: u16,
    assists: u16,
) -> BoxscoreRow {
    BoxscoreRow {
        game_id: GameId::from(game),
        player_id: PlayerId(player),
        team_id: TeamId(team),
        opponent_team_id: TeamId(opponent),
        minutes: 30.0,
        points,
        rebounds,
        assists,
        steals: 0,
        blocks: 0,
        turnovers: 0,
        fgm: 0,
        fga: 0,
        fg3m: 0,
        fg3a: 0,
        ftm: 0,
        fta: 0,
    }
}

/// A row scoring exactly `points` fantasy points under default weights
pub fn scoring_row(game: &str, player: i64, team: i64, opponent: i64, points: u16) -> BoxscoreRow {
    boxscore(game, player, team, opponent, points, 0, 0)
}
