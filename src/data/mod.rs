//! Data ingestion and storage
//!
//! Raw CSV import, value cleaning and SQLite persistence.

pub mod database;
pub mod import;
pub mod normalize;

pub use database::{Database, DatabaseStats, NewBout};
pub use import::{import_dir, ImportSummary, Importer};
