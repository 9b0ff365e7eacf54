//! Point-in-time feature synthesis for MMA bout prediction
//!
//! Reconstructs each fighter's history as of a date, expands every prior bout
//! into per-category differentials and aggregates them into windowed features
//! that can be differenced against an opponent.

pub mod data;
pub mod features;
pub mod predict;

use chrono::NaiveDate;
use features::catalog::{Category, Modifier, StatKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Unique identifier for a fighter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FighterId(pub i64);

impl fmt::Display for FighterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fighter({})", self.0)
    }
}

/// Unique identifier for a bout
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BoutId(pub i64);

impl fmt::Display for BoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bout({})", self.0)
    }
}

/// How a bout finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    KoTko,
    Submission,
    Decision,
}

impl Method {
    pub const ALL: [Method; 3] = [Method::KoTko, Method::Submission, Method::Decision];

    /// Stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::KoTko => "ko/tko",
            Method::Submission => "submission",
            Method::Decision => "decision",
        }
    }

    /// Prefix used in outcome feature names
    pub fn feature_prefix(&self) -> &'static str {
        match self {
            Method::KoTko => "ko",
            Method::Submission => "sub",
            Method::Decision => "dec",
        }
    }

    /// Parse a stored method string
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "ko/tko" => Some(Method::KoTko),
            "submission" => Some(Method::Submission),
            "decision" => Some(Method::Decision),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weight division, derived from a fighter's listed weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WeightClass {
    Flyweight,
    Bantamweight,
    Featherweight,
    Lightweight,
    Welterweight,
    Middleweight,
    LightHeavyweight,
    Heavyweight,
}

impl WeightClass {
    /// Divisions whose bouts are imported; heavyweights only get z-scores
    pub const IMPORTED: [WeightClass; 7] = [
        WeightClass::Flyweight,
        WeightClass::Bantamweight,
        WeightClass::Featherweight,
        WeightClass::Lightweight,
        WeightClass::Welterweight,
        WeightClass::Middleweight,
        WeightClass::LightHeavyweight,
    ];

    const LIMITS: [(f64, WeightClass); 7] = [
        (125.0, WeightClass::Flyweight),
        (135.0, WeightClass::Bantamweight),
        (145.0, WeightClass::Featherweight),
        (155.0, WeightClass::Lightweight),
        (170.0, WeightClass::Welterweight),
        (185.0, WeightClass::Middleweight),
        (205.0, WeightClass::LightHeavyweight),
    ];

    /// Lightest division whose limit the weight fits under
    pub fn from_weight(pounds: f64) -> Self {
        Self::LIMITS
            .iter()
            .find(|(limit, _)| pounds <= *limit)
            .map(|(_, class)| *class)
            .unwrap_or(WeightClass::Heavyweight)
    }

    pub fn code(&self) -> &'static str {
        match self {
            WeightClass::Flyweight => "flyweight",
            WeightClass::Bantamweight => "bantamweight",
            WeightClass::Featherweight => "featherweight",
            WeightClass::Lightweight => "lightweight",
            WeightClass::Welterweight => "welterweight",
            WeightClass::Middleweight => "middleweight",
            WeightClass::LightHeavyweight => "light_heavyweight",
            WeightClass::Heavyweight => "heavyweight",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_lowercase().as_str() {
            "flyweight" => Some(WeightClass::Flyweight),
            "bantamweight" => Some(WeightClass::Bantamweight),
            "featherweight" => Some(WeightClass::Featherweight),
            "lightweight" => Some(WeightClass::Lightweight),
            "welterweight" => Some(WeightClass::Welterweight),
            "middleweight" => Some(WeightClass::Middleweight),
            "light_heavyweight" | "light heavyweight" => Some(WeightClass::LightHeavyweight),
            "heavyweight" => Some(WeightClass::Heavyweight),
            _ => None,
        }
    }
}

/// Height, weight and reach (inches / pounds), or their z-scores
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Physique {
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub reach: Option<f64>,
}

/// A competitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Competitor {
    pub id: FighterId,
    pub name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub weight_class: Option<WeightClass>,
    pub physique: Physique,
    /// Population z-scores within the weight class
    pub zscores: Physique,
}

impl Competitor {
    /// Age in years on the given date
    pub fn age_on(&self, date: NaiveDate) -> Option<f64> {
        self.date_of_birth
            .map(|dob| (date - dob).num_days() as f64 / 365.25)
    }
}

/// A completed bout between two competitors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoutRecord {
    pub id: BoutId,
    pub date: NaiveDate,
    pub method: Method,
    /// Total elapsed time in seconds
    pub duration_secs: f64,
    pub fighter: FighterId,
    pub opponent: FighterId,
    pub winner: FighterId,
}

impl BoutRecord {
    /// Check whether a competitor took part
    pub fn involves(&self, competitor: FighterId) -> bool {
        self.fighter == competitor || self.opponent == competitor
    }

    /// Get the opponent for a given competitor
    pub fn opponent_of(&self, competitor: FighterId) -> Option<FighterId> {
        if competitor == self.fighter {
            Some(self.opponent)
        } else if competitor == self.opponent {
            Some(self.fighter)
        } else {
            None
        }
    }

    /// Check if the given competitor won this bout
    pub fn did_win(&self, competitor: FighterId) -> Option<bool> {
        if self.involves(competitor) {
            Some(self.winner == competitor)
        } else {
            None
        }
    }
}

/// One observed value for one competitor in one bout
#[derive(Debug, Clone, PartialEq)]
pub struct StatMeasurement {
    pub bout: BoutId,
    pub competitor: FighterId,
    pub category: Category,
    pub modifier: Option<Modifier>,
    pub kind: StatKind,
    pub value: f64,
}

impl StatMeasurement {
    /// A raw observed value
    pub fn total(
        bout: BoutId,
        competitor: FighterId,
        category: Category,
        modifier: Option<Modifier>,
        value: f64,
    ) -> Self {
        StatMeasurement {
            bout,
            competitor,
            category,
            modifier,
            kind: StatKind::Total,
            value,
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum MmaError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Competitor not found with ID: {0}")]
    CompetitorNotFound(FighterId),

    #[error("Unknown competitor: {0}")]
    UnknownCompetitor(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, MmaError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub assembly: AssemblyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    pub features_path: String,
    /// Directory holding the raw event/result/stat/fighter CSV exports
    pub raw_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyConfig {
    /// Compute training rows across threads
    pub parallel: bool,
    /// Only emit training rows for bouts on or after this date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<NaiveDate>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data: DataConfig {
                database_path: "data/mma.db".to_string(),
                features_path: "data/fighter_stats.csv".to_string(),
                raw_dir: "data/raw".to_string(),
            },
            assembly: AssemblyConfig {
                parallel: true,
                since: None,
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MmaError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| MmaError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| MmaError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_bout() -> BoutRecord {
        BoutRecord {
            id: BoutId(1),
            date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
            method: Method::Decision,
            duration_secs: 900.0,
            fighter: FighterId(1),
            opponent: FighterId(2),
            winner: FighterId(2),
        }
    }

    #[test]
    fn test_bout_perspective() {
        let bout = make_bout();
        assert_eq!(bout.opponent_of(FighterId(1)), Some(FighterId(2)));
        assert_eq!(bout.opponent_of(FighterId(2)), Some(FighterId(1)));
        assert_eq!(bout.opponent_of(FighterId(3)), None);
        assert_eq!(bout.did_win(FighterId(1)), Some(false));
        assert_eq!(bout.did_win(FighterId(2)), Some(true));
        assert_eq!(bout.did_win(FighterId(3)), None);
    }

    #[test]
    fn test_weight_class_from_weight() {
        assert_eq!(WeightClass::from_weight(125.0), WeightClass::Flyweight);
        assert_eq!(WeightClass::from_weight(155.0), WeightClass::Lightweight);
        assert_eq!(WeightClass::from_weight(170.0), WeightClass::Welterweight);
        assert_eq!(WeightClass::from_weight(205.0), WeightClass::LightHeavyweight);
        assert_eq!(WeightClass::from_weight(206.0), WeightClass::Heavyweight);
        assert_eq!(
            WeightClass::from_code(WeightClass::LightHeavyweight.code()),
            Some(WeightClass::LightHeavyweight)
        );
        assert!(WeightClass::IMPORTED.contains(&WeightClass::Flyweight));
        assert!(!WeightClass::IMPORTED.contains(&WeightClass::Heavyweight));
    }

    #[test]
    fn test_method_codes() {
        for method in Method::ALL {
            assert_eq!(Method::from_str_opt(method.as_str()), Some(method));
        }
        assert_eq!(Method::from_str_opt("dq"), None);
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();

        let mut config = Config::default();
        config.assembly.since = NaiveDate::from_ymd_opt(2016, 1, 1);
        config.save(path).unwrap();

        let loaded = Config::load(path).unwrap();
        assert_eq!(loaded.data.database_path, config.data.database_path);
        assert_eq!(loaded.assembly.since, config.assembly.since);
        assert!(loaded.assembly.parallel);
    }

    #[test]
    fn test_age_on() {
        let competitor = Competitor {
            id: FighterId(1),
            name: "Test Fighter".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1),
            weight_class: Some(WeightClass::Lightweight),
            physique: Physique::default(),
            zscores: Physique::default(),
        };
        let age = competitor
            .age_on(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
            .unwrap();
        assert!((age - 30.0).abs() < 0.01);
    }
}
