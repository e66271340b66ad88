//! CSV and JSON writers for forecasts and feature history

use crate::features::FeatureHistoryRow;
use crate::predict::{ForecastRecord, ForecastRun};
use crate::Result;
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Column order of the forecast file
pub const FORECAST_HEADER: [&str; 6] = [
    "player",
    "team",
    "avg_fp_l10",
    "consistency",
    "opp_dvp",
    "forecast",
];

/// Forecast row with numbers already at their fixed precision
#[derive(Debug, Serialize)]
struct ForecastRow<'a> {
    player: &'a str,
    team: &'a str,
    avg_fp_l10: String,
    consistency: String,
    opp_dvp: String,
    forecast: String,
}

impl<'a> From<&'a ForecastRecord> for ForecastRow<'a> {
    fn from(record: &'a ForecastRecord) -> Self {
        ForecastRow {
            player: &record.player,
            team: &record.team,
            avg_fp_l10: format!("{:.2}", record.fppg),
            consistency: format!("{:.1}", record.consistency),
            opp_dvp: format!("{:.3}", record.dvp_factor),
            forecast: format!("{:.2}", record.forecast),
        }
    }
}

/// Write forecasts as CSV in the order given
pub fn write_forecasts<W: Write>(writer: W, forecasts: &[ForecastRecord]) -> Result<()> {
    let mut csv_wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    csv_wtr.write_record(FORECAST_HEADER)?;
    for record in forecasts {
        csv_wtr.serialize(ForecastRow::from(record))?;
    }
    csv_wtr.flush()?;
    Ok(())
}

/// Write the forecast CSV to a file, creating parent directories
pub fn write_forecasts_to_path<P: AsRef<Path>>(path: P, forecasts: &[ForecastRecord]) -> Result<()> {
    let writer = create(path.as_ref())?;
    write_forecasts(writer, forecasts)?;
    log::info!(
        "Wrote {} forecasts to {}",
        forecasts.len(),
        path.as_ref().display()
    );
    Ok(())
}

/// Full run, including exclusions and confidence flags, as pretty JSON
pub fn write_forecasts_json<W: Write>(mut writer: W, run: &ForecastRun) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, run)?;
    writer.write_all(b"\n")?;
    Ok(())
}

pub fn write_feature_history<W: Write>(writer: W, rows: &[FeatureHistoryRow]) -> Result<()> {
    let mut csv_wtr = WriterBuilder::new().from_writer(writer);
    for row in rows {
        csv_wtr.serialize(row)?;
    }
    csv_wtr.flush()?;
    Ok(())
}

pub fn write_feature_history_to_path<P: AsRef<Path>>(
    path: P,
    rows: &[FeatureHistoryRow],
) -> Result<()> {
    let writer = create(path.as_ref())?;
    write_feature_history(writer, rows)?;
    log::info!(
        "Wrote {} feature history rows to {}",
        rows.len(),
        path.as_ref().display()
    );
    Ok(())
}

/// Render a run for the terminal
pub fn format_table(run: &ForecastRun) -> String {
    let mut out = String::new();
    out.push_str(&format!("\nForecasts for {}\n", run.date));
    out.push_str("──────────────────────────────────────────────────────────────────────\n");
    out.push_str(&format!(
        "{:<4} {:<24} {:<5} {:<5} {:>7} {:>6} {:>6} {:>8}\n",
        "#", "Player", "Team", "Opp", "FP/G", "Cons", "DvP", "Forecast"
    ));
    for (rank, f) in run.forecasts.iter().enumerate() {
        let flag = if f.dvp_low_confidence { "*" } else { "" };
        out.push_str(&format!(
            "{:<4} {:<24} {:<5} {:<5} {:>7.2} {:>6.1} {:>6.3} {:>8.2} {}\n",
            rank + 1,
            f.player,
            f.team,
            f.opponent,
            f.fppg,
            f.consistency,
            f.dvp_factor,
            f.forecast,
            flag
        ));
    }
    if run.low_confidence_count() > 0 {
        out.push_str("\n* opponent sample too small, neutral DvP used\n");
    }
    if !run.exclusions.is_empty() {
        out.push_str(&format!("\nExcluded ({}):\n", run.exclusions.len()));
        for e in &run.exclusions {
            out.push_str(&format!("  {} ({}): {}\n", e.player, e.player_id, e.reason));
        }
    }
    out
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(BufWriter::new(File::create(path)?))
}
