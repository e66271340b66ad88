//! NBA Forecast CLI
//!
//! Imports box score exports into SQLite and forecasts fantasy points for a
//! date's slate of games.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use nba::{Config, NbaError, Result};

#[derive(Parser)]
#[command(name = "nba")]
#[command(about = "NBA player fantasy point forecasts from box score history", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Forecast every player on a date's slate
    Forecast {
        /// Target date (YYYY-MM-DD or "tonight")
        #[arg(long, default_value = "tonight")]
        date: String,
        /// Restrict to a player (name or id), repeatable
        #[arg(long)]
        player: Vec<String>,
        /// Restrict to a team (abbreviation or name), repeatable
        #[arg(long)]
        team: Vec<String>,
        /// Override the rolling window size
        #[arg(long)]
        window: Option<usize>,
        /// Output CSV path (defaults to data.output_path)
        #[arg(long)]
        output: Option<String>,
        /// Output format for stdout
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Show one player's features against an opponent
    Features {
        /// Player name or id
        player: String,
        /// Opponent abbreviation or name
        #[arg(long)]
        opponent: String,
        /// As-of date (YYYY-MM-DD or "tonight")
        #[arg(long, default_value = "tonight")]
        date: String,
    },
    /// Write the per-game rolling feature history
    ExportFeatures {
        /// Output CSV path (defaults to data.history_path)
        #[arg(long)]
        output: Option<String>,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Import teams.csv, players.csv, games.csv and boxscores.csv
    Import {
        /// Directory containing the exports
        dir: String,
    },
    /// Show database status
    Status,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

/// "tonight" resolves to the local calendar date
fn parse_date(text: &str) -> Result<NaiveDate> {
    if text.eq_ignore_ascii_case("tonight") || text.eq_ignore_ascii_case("today") {
        return Ok(chrono::Local::now().date_naive());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|e| NbaError::Parse(format!("Invalid date '{}': {}", text, e)))
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    // Run command
    let result = match cli.command {
        Commands::Data { action } => match action {
            DataCommands::Import { dir } => commands::data_import(&config, &dir),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Forecast {
            date,
            player,
            team,
            window,
            output,
            format,
        } => commands::forecast(config, &date, player, team, window, output, format),
        Commands::Features {
            player,
            opponent,
            date,
        } => commands::features(&config, &player, &opponent, &date),
        Commands::ExportFeatures { output } => commands::export_features(&config, output),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use nba::data::{Database, Importer};
    use nba::features::{feature_history, FeatureEngine};
    use nba::output;
    use nba::predict::{Forecaster, RosterFilter};

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        // Create data directories
        std::fs::create_dir_all("data")?;
        std::fs::create_dir_all("outputs")?;
        println!("Created data/ and outputs/ directories");

        println!("\nNext steps:");
        println!("  1. Edit {} to customize scoring weights and windows", config_path);
        println!("  2. Run 'nba data import <DIR>' to load box score exports");
        println!("  3. Run 'nba forecast --date tonight' to forecast the slate");

        Ok(())
    }

    pub fn data_import(config: &Config, dir: &str) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;

        println!("Importing exports from {}...", dir);
        let report = Importer::new(&db).import_dir(dir)?;

        println!("Imported:");
        println!("  Teams:      {}", report.teams);
        println!("  Players:    {}", report.players);
        println!("  Games:      {}", report.games);
        println!("  Box scores: {}", report.boxscores);
        if report.duplicates > 0 {
            println!("  Duplicates: {} (already stored)", report.duplicates);
        }
        if report.rejected > 0 {
            println!("  Rejected:   {} (see log)", report.rejected);
        }

        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let db = Database::open_existing(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:       {}", config.data.database_path);
        println!("  Teams:      {}", stats.team_count);
        println!("  Players:    {}", stats.player_count);
        println!("  Games:      {}", stats.game_count);
        println!("  Box scores: {}", stats.boxscore_count);
        if let (Some(earliest), Some(latest)) = (stats.earliest_game, stats.latest_game) {
            println!("  Range:      {} to {}", earliest, latest);
        }

        Ok(())
    }

    pub fn forecast(
        mut config: Config,
        date: &str,
        players: Vec<String>,
        teams: Vec<String>,
        window: Option<usize>,
        output_path: Option<String>,
        format: OutputFormat,
    ) -> Result<()> {
        let date = parse_date(date)?;
        if let Some(window) = window {
            config.features.window = window;
            config.validate()?;
        }

        let db = Database::open_existing(&config.data.database_path)?;
        let snapshot = db.load_snapshot()?;

        let filter = RosterFilter { players, teams };
        let run = Forecaster::new(&snapshot, &config).run(date, &filter)?;

        let path = output_path.unwrap_or_else(|| config.data.output_path.clone());
        output::write_forecasts_to_path(&path, &run.forecasts)?;

        match format {
            OutputFormat::Table => {
                print!("{}", output::format_table(&run));
                println!("\nSaved to {}", path);
            }
            OutputFormat::Json => {
                output::write_forecasts_json(std::io::stdout().lock(), &run)?;
            }
            OutputFormat::Csv => {
                output::write_forecasts(std::io::stdout().lock(), &run.forecasts)?;
            }
        }

        Ok(())
    }

    pub fn features(config: &Config, player: &str, opponent: &str, date: &str) -> Result<()> {
        let date = parse_date(date)?;
        let db = Database::open_existing(&config.data.database_path)?;
        let snapshot = db.load_snapshot()?;

        let player = snapshot
            .find_player(player)
            .ok_or_else(|| NbaError::UnknownPlayer(player.to_string()))?;
        let opponent = snapshot
            .find_team(opponent)
            .ok_or_else(|| NbaError::UnknownTeam(opponent.to_string()))?;

        let engine = FeatureEngine::new(&snapshot, config);
        let record = engine.compute(player, opponent.id, date)?;
        let forecast = Forecaster::new(&snapshot, config).forecast_player(player, opponent.id, date)?;

        println!("\n{} vs {} as of {}", player.name, opponent.abbreviation, date);
        println!("───────────────────────────────");
        println!("  Position:     {}", record.position);
        println!("  Games used:   {}", record.games_used);
        println!("  Avg minutes:  {:.1}", record.avg_minutes);
        if let Some(rest) = record.days_rest {
            println!("  Days rest:    {}", rest);
        }
        println!("  FP/G (L{}):   {:.2}", config.features.window, record.fppg);
        println!("  Consistency:  {:.1}", record.consistency);
        println!(
            "  Opp DvP:      {:.3} ({} games{})",
            record.dvp.factor,
            record.dvp.sample_games,
            if record.dvp.low_confidence {
                ", low confidence"
            } else {
                ""
            }
        );
        println!("  Forecast:     {:.2}", forecast.forecast);

        Ok(())
    }

    pub fn export_features(config: &Config, output_path: Option<String>) -> Result<()> {
        let db = Database::open_existing(&config.data.database_path)?;
        let snapshot = db.load_snapshot()?;

        let rows = feature_history(&snapshot, &config.features, &config.scoring);
        let path = output_path.unwrap_or_else(|| config.data.history_path.clone());
        output::write_feature_history_to_path(&path, &rows)?;
        println!("Wrote {} rows to {}", rows.len(), path);

        Ok(())
    }
}
