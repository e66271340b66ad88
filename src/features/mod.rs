//! Feature extraction
//!
//! Converts raw box score history into the rolling fantasy average, the
//! consistency score and the defense-vs-position factor.

pub mod consistency;
pub mod dvp;
pub mod engine;
pub mod history;
pub mod rolling;
pub mod scoring;

pub use dvp::{DefenseVsPosition, DvpFactor};
pub use engine::{FeatureEngine, FeatureRecord};
pub use history::{feature_history, FeatureHistoryRow};
pub use rolling::RollingWindow;
