//! Point-in-time feature synthesis
//!
//! history extraction -> per-bout expansion -> windowed aggregation ->
//! matchup differencing -> flat rows.

pub mod aggregator;
pub mod assembly;
pub mod catalog;
pub mod differential;
pub mod expander;
pub mod history;
pub mod index;
pub mod matchup;

pub use aggregator::{aggregate, snapshot, FighterSnapshot, RECENT_WINDOW_DAYS};
pub use assembly::{matchup_row, write_csv, write_csv_file, FeatureAssembler, FeatureRow};
pub use catalog::{Aggregate, Category, FeatureKey, Modifier, OutcomeStat, StatKind};
pub use history::{extract_history, FighterHistory, HistoryStore};
pub use index::HistoryIndex;
pub use matchup::{diff_vector, MatchupVector};
