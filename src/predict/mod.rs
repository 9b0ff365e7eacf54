//! Prediction-time feature rows
//!
//! Resolve a pairing by name and build its matchup features as of a date.

pub mod inference;

pub use inference::{Matchup, MatchupPredictor};
