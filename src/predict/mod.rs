//! Forecasting
//!
//! Combine player features into a fantasy point forecast and run it across
//! a date's slate.

pub mod forecast;
pub mod pipeline;

pub use forecast::{combine, ForecastRecord};
pub use pipeline::{Exclusion, ExclusionReason, ForecastRun, Forecaster, RosterFilter};
