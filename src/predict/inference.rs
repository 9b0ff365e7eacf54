//! Inference rows for hypothetical pairings

use chrono::NaiveDate;
use serde::Serialize;

use crate::features::assembly::{matchup_row, FeatureRow};
use crate::features::HistoryStore;
use crate::{Competitor, MmaError, Result};

/// Snapshot features shown side by side in the matchup table
pub const HIGHLIGHTS: [&str; 12] = [
    "wins",
    "losses",
    "win_ratio",
    "recent_wins",
    "recent_losses",
    "ko_wins",
    "sub_wins",
    "dec_wins",
    "avg_significant_strikes_landed",
    "avg_significant_strikes_landed_diff",
    "avg_takedowns_landed",
    "avg_control_time",
];

/// A resolved pairing and its feature row
#[derive(Debug, Clone, Serialize)]
pub struct Matchup {
    pub fighter: Competitor,
    pub opponent: Competitor,
    pub row: FeatureRow,
}

impl Matchup {
    /// (feature, fighter value, opponent value) for each highlighted feature
    pub fn highlights(&self) -> Vec<(&'static str, f64, f64)> {
        HIGHLIGHTS
            .iter()
            .map(|name| {
                let own = self.value(&format!("precomp_{}", name));
                let theirs = self.value(&format!("opponent_precomp_{}", name));
                (*name, own, theirs)
            })
            .collect()
    }

    fn value(&self, key: &str) -> f64 {
        self.row.features.get(key).copied().unwrap_or(0.0)
    }
}

/// Builds matchup rows from any history store
pub struct MatchupPredictor<'a, S: HistoryStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: HistoryStore + ?Sized> MatchupPredictor<'a, S> {
    pub fn new(store: &'a S) -> Self {
        MatchupPredictor { store }
    }

    /// Resolve both names and build the row as of `date`
    pub fn predict(&self, fighter: &str, opponent: &str, date: NaiveDate) -> Result<Matchup> {
        let fighter = self.resolve(fighter)?;
        let opponent = self.resolve(opponent)?;
        let row = matchup_row(self.store, fighter.id, opponent.id, date)?;
        log::info!(
            "Built {} features for {} vs {} as of {}",
            row.features.len(),
            fighter.name,
            opponent.name,
            date
        );
        Ok(Matchup {
            fighter,
            opponent,
            row,
        })
    }

    fn resolve(&self, name: &str) -> Result<Competitor> {
        self.store
            .competitor_by_name(name)?
            .ok_or_else(|| MmaError::UnknownCompetitor(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Database, NewBout};
    use crate::features::catalog::{Category, Modifier};
    use crate::{Method, Physique, StatMeasurement};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_db() -> Database {
        let db = Database::in_memory().unwrap();
        let a = db
            .upsert_competitor("Alex Pereira", Some(date(1987, 7, 7)), Physique::default())
            .unwrap();
        let b = db
            .upsert_competitor("Israel Adesanya", Some(date(1989, 7, 22)), Physique::default())
            .unwrap();
        let bout = db
            .upsert_bout(&NewBout {
                date: date(2022, 11, 12),
                method: Method::KoTko,
                duration_secs: 1128.0,
                fighter: a,
                opponent: b,
                winner: a,
            })
            .unwrap();
        for (who, value) in [(a, 60.0), (b, 90.0)] {
            db.upsert_measurement(&StatMeasurement::total(
                bout,
                who,
                Category::SignificantStrikes,
                Some(Modifier::Landed),
                value,
            ))
            .unwrap();
        }
        db
    }

    #[test]
    fn test_predict_by_name() {
        let db = make_db();
        let predictor = MatchupPredictor::new(&db);
        let matchup = predictor
            .predict("alex  pereira", "Israel Adesanya", date(2023, 4, 8))
            .unwrap();

        assert_eq!(matchup.fighter.name, "Alex Pereira");
        assert_eq!(matchup.row.outcome, None);
        let highlights = matchup.highlights();
        assert_eq!(highlights.len(), HIGHLIGHTS.len());
        assert_eq!(highlights[0], ("wins", 1.0, 0.0));
        assert_eq!(matchup.row.features["precomp_ko_wins"], 1.0);
        assert_eq!(
            matchup.row.features["precomp_avg_significant_strikes_landed_vs_opp"],
            -30.0
        );
    }

    #[test]
    fn test_cutoff_hides_the_bout_itself() {
        let db = make_db();
        let matchup = MatchupPredictor::new(&db)
            .predict("Alex Pereira", "Israel Adesanya", date(2022, 11, 12))
            .unwrap();
        assert!(matchup.highlights().iter().all(|(_, a, b)| *a == 0.0 && *b == 0.0));
    }

    #[test]
    fn test_unknown_name() {
        let db = make_db();
        let err = MatchupPredictor::new(&db)
            .predict("Alex Pereira", "Nobody", date(2023, 1, 1))
            .unwrap_err();
        assert!(matches!(err, MmaError::UnknownCompetitor(name) if name == "Nobody"));
    }

    #[test]
    fn test_json_output() {
        let db = make_db();
        let matchup = MatchupPredictor::new(&db)
            .predict("Alex Pereira", "Israel Adesanya", date(2023, 4, 8))
            .unwrap();
        let json = serde_json::to_value(&matchup).unwrap();
        assert_eq!(json["fighter"]["name"], "Alex Pereira");
        assert_eq!(json["row"]["features"]["precomp_wins"], 1.0);
    }
}
