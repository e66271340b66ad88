//! Output writers
//!
//! Forecast tables and feature history as CSV, JSON or a terminal table.

pub mod writer;

pub use writer::{
    format_table, write_feature_history, write_feature_history_to_path, write_forecasts,
    write_forecasts_json, write_forecasts_to_path, FORECAST_HEADER,
};
