//! Data ingestion and storage
//!
//! CSV import of raw provider exports, SQLite storage, and the in-memory
//! snapshot the feature engine reads from.

pub mod database;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod import;
pub mod snapshot;

pub use database::Database;
pub use import::{ImportReport, Importer};
pub use snapshot::{DatedBoxscore, Snapshot};
