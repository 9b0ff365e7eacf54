//! Temporal aggregation of expanded bout rows
//!
//! Produces one [`FighterSnapshot`] per (fighter, cutoff): for every tracked
//! key the all-time average, peak and valley, the trailing-window average and
//! four guarded ratios, plus win/loss counts per finishing method.

use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, HashMap};

use crate::features::catalog::{
    Aggregate, FeatureKey, OutcomeStat, OUTCOME_STATS, RECENT_TOTAL_FIGHT_TIME, TOTAL_FIGHT_TIME,
    TRACKED_KEYS,
};
use crate::features::expander::expand_bout;
use crate::features::history::{extract_history, BoutHistory, FighterHistory, HistoryStore};
use crate::{FighterId, Method, Result};

/// Trailing window for the `recent_` features
pub const RECENT_WINDOW_DAYS: i64 = 730;

/// Every feature describing a fighter's history before a date
#[derive(Debug, Clone, PartialEq)]
pub struct FighterSnapshot {
    pub fighter: FighterId,
    pub as_of: NaiveDate,
    pub features: BTreeMap<String, f64>,
}

impl FighterSnapshot {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.features.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.features.iter()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// `numerator / divisor`, or 0 when the divisor is 0
pub fn guarded_ratio(numerator: f64, divisor: f64) -> f64 {
    if divisor == 0.0 {
        0.0
    } else {
        numerator / divisor
    }
}

#[derive(Debug, Clone, Copy)]
struct Summary {
    sum: f64,
    count: usize,
    peak: f64,
    valley: f64,
}

impl Summary {
    fn new(value: f64) -> Self {
        Summary {
            sum: value,
            count: 1,
            peak: value,
            valley: value,
        }
    }

    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
        self.peak = self.peak.max(value);
        self.valley = self.valley.min(value);
    }

    fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

/// Running sums for one window
#[derive(Debug, Default)]
struct WindowAccumulator {
    stats: HashMap<FeatureKey, Summary>,
    wins: u32,
    losses: u32,
    method_wins: HashMap<Method, u32>,
    method_losses: HashMap<Method, u32>,
    fight_time: f64,
}

impl WindowAccumulator {
    fn from_bouts(fighter: FighterId, bouts: &[BoutHistory]) -> Self {
        let mut acc = WindowAccumulator::default();
        for entry in bouts {
            acc.push(fighter, entry);
        }
        acc
    }

    fn push(&mut self, fighter: FighterId, entry: &BoutHistory) {
        for stat in expand_bout(entry) {
            self.stats
                .entry(stat.key)
                .and_modify(|s| s.push(stat.value))
                .or_insert_with(|| Summary::new(stat.value));
        }

        let bout = &entry.bout;
        self.fight_time += bout.duration_secs;
        match bout.did_win(fighter) {
            Some(true) => {
                self.wins += 1;
                *self.method_wins.entry(bout.method).or_default() += 1;
            }
            Some(false) => {
                self.losses += 1;
                *self.method_losses.entry(bout.method).or_default() += 1;
            }
            None => {}
        }
    }

    fn mean(&self, key: &FeatureKey) -> f64 {
        self.stats.get(key).map(Summary::mean).unwrap_or(0.0)
    }

    fn method_wins(&self, method: Method) -> f64 {
        self.method_wins.get(&method).copied().unwrap_or(0) as f64
    }

    fn method_losses(&self, method: Method) -> f64 {
        self.method_losses.get(&method).copied().unwrap_or(0) as f64
    }
}

/// Summarise a fighter's history into a snapshot
pub fn aggregate(history: &FighterHistory) -> FighterSnapshot {
    let window_start = history
        .before
        .checked_sub_signed(Duration::days(RECENT_WINDOW_DAYS))
        .unwrap_or(NaiveDate::MIN);
    let full = WindowAccumulator::from_bouts(history.fighter, &history.bouts);
    let recent = WindowAccumulator::from_bouts(history.fighter, history.since(window_start));

    let mut features = BTreeMap::new();

    for key in TRACKED_KEYS.iter() {
        let (average, peak, valley) = match full.stats.get(key) {
            Some(summary) => (summary.mean(), summary.peak, summary.valley),
            None => (0.0, 0.0, 0.0),
        };
        let recent_average = recent.mean(key);

        for aggregate in Aggregate::ALL {
            let value = match aggregate {
                Aggregate::Average => average,
                Aggregate::Peak => peak,
                Aggregate::Valley => valley,
                Aggregate::RecentAverage => recent_average,
                Aggregate::AverageVsPeak => guarded_ratio(average, peak),
                Aggregate::AverageVsValley => guarded_ratio(average, valley),
                Aggregate::RecentAverageVsPeak => guarded_ratio(recent_average, peak),
                Aggregate::RecentAverageVsValley => guarded_ratio(recent_average, valley),
            };
            features.insert(key.name(aggregate), value);
        }
    }

    for stat in OUTCOME_STATS.iter() {
        let value = match *stat {
            OutcomeStat::Wins => full.wins as f64,
            OutcomeStat::Losses => full.losses as f64,
            OutcomeStat::WinRatio => {
                guarded_ratio(full.wins as f64, (full.wins + full.losses) as f64)
            }
            OutcomeStat::RecentWins => recent.wins as f64,
            OutcomeStat::RecentLosses => recent.losses as f64,
            OutcomeStat::MethodWins(m) => full.method_wins(m),
            OutcomeStat::MethodLosses(m) => full.method_losses(m),
            OutcomeStat::MethodWinRatio(m) => guarded_ratio(
                full.method_wins(m),
                full.method_wins(m) + full.method_losses(m),
            ),
            OutcomeStat::MethodLossRatio(m) => guarded_ratio(
                full.method_losses(m),
                full.method_wins(m) + full.method_losses(m),
            ),
            OutcomeStat::RecentMethodWins(m) => recent.method_wins(m),
            OutcomeStat::RecentMethodLosses(m) => recent.method_losses(m),
        };
        features.insert(stat.name(), value);
    }

    features.insert(TOTAL_FIGHT_TIME.to_string(), full.fight_time);
    features.insert(RECENT_TOTAL_FIGHT_TIME.to_string(), recent.fight_time);

    FighterSnapshot {
        fighter: history.fighter,
        as_of: history.before,
        features,
    }
}

/// Extract and aggregate in one step
pub fn snapshot<S: HistoryStore + ?Sized>(
    store: &S,
    fighter: FighterId,
    before: NaiveDate,
) -> Result<FighterSnapshot> {
    let history = extract_history(store, fighter, before)?;
    log::debug!(
        "{} has {} bouts before {}",
        fighter,
        history.len(),
        before
    );
    Ok(aggregate(&history))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::catalog::{Category, Modifier};
    use crate::features::HistoryIndex;
    use crate::{BoutId, BoutRecord, Competitor, Physique, StatMeasurement};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn competitor(id: i64) -> Competitor {
        Competitor {
            id: FighterId(id),
            name: format!("Fighter {}", id),
            date_of_birth: None,
            weight_class: None,
            physique: Physique::default(),
            zscores: Physique::default(),
        }
    }

    fn bout(id: i64, date: NaiveDate, method: Method, winner: i64) -> BoutRecord {
        BoutRecord {
            id: BoutId(id),
            date,
            method,
            duration_secs: 900.0,
            fighter: FighterId(1),
            opponent: FighterId(2),
            winner: FighterId(winner),
        }
    }

    fn landed(bout: i64, fighter: i64, value: f64) -> StatMeasurement {
        StatMeasurement::total(
            BoutId(bout),
            FighterId(fighter),
            Category::SignificantStrikes,
            Some(Modifier::Landed),
            value,
        )
    }

    /// One decision win on 2020-01-01, 10 landed vs 5
    fn scenario_a() -> HistoryIndex {
        HistoryIndex::new(
            vec![competitor(1), competitor(2)],
            vec![bout(1, date(2020, 1, 1), Method::Decision, 1)],
            vec![landed(1, 1, 10.0), landed(1, 2, 5.0)],
        )
    }

    #[test]
    fn test_single_decision_win() {
        let snap = snapshot(&scenario_a(), FighterId(1), date(2021, 1, 1)).unwrap();

        for name in [
            "avg_significant_strikes_landed",
            "significant_strikes_landed_peak",
            "significant_strikes_landed_valley",
            "recent_avg_significant_strikes_landed",
        ] {
            assert_eq!(snap.get(name), Some(10.0), "{}", name);
        }
        assert_eq!(snap.get("wins"), Some(1.0));
        assert_eq!(snap.get("losses"), Some(0.0));
        assert_eq!(snap.get("win_ratio"), Some(1.0));
        assert_eq!(snap.get("dec_wins"), Some(1.0));
        assert_eq!(snap.get("dec_win_ratio"), Some(1.0));
        assert_eq!(snap.get("ko_wins"), Some(0.0));
        let diff = snap.get("avg_significant_strikes_landed_diff").unwrap();
        assert!((diff - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(snap.get(TOTAL_FIGHT_TIME), Some(900.0));

        // Attempted was never recorded, so its keys exist but stay zero
        assert_eq!(snap.get("avg_significant_strikes_attempted"), Some(0.0));
    }

    #[test]
    fn test_opponent_perspective_counts_loss() {
        let snap = snapshot(&scenario_a(), FighterId(2), date(2021, 1, 1)).unwrap();
        assert_eq!(snap.get("losses"), Some(1.0));
        assert_eq!(snap.get("dec_losses"), Some(1.0));
        assert_eq!(snap.get("dec_loss_ratio"), Some(1.0));
        assert_eq!(snap.get("win_ratio"), Some(0.0));
        let diff = snap.get("avg_significant_strikes_landed_diff").unwrap();
        assert!((diff + 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_history_is_all_zero() {
        let index = HistoryIndex::new(vec![competitor(1)], vec![], vec![]);
        let snap = snapshot(&index, FighterId(1), date(2021, 1, 1)).unwrap();

        assert_eq!(
            snap.len(),
            TRACKED_KEYS.len() * Aggregate::ALL.len() + OUTCOME_STATS.len() + 2
        );
        assert!(snap.iter().all(|(_, v)| *v == 0.0));
    }

    #[test]
    fn test_cutoff_excludes_same_day_bout() {
        let index = scenario_a();
        let on_day = snapshot(&index, FighterId(1), date(2020, 1, 1)).unwrap();
        assert_eq!(on_day.get("wins"), Some(0.0));
        assert_eq!(on_day.get("avg_significant_strikes_landed"), Some(0.0));

        let next_day = snapshot(&index, FighterId(1), date(2020, 1, 2)).unwrap();
        assert_eq!(next_day.get("wins"), Some(1.0));
    }

    #[test]
    fn test_later_bouts_do_not_leak() {
        let before = snapshot(&scenario_a(), FighterId(1), date(2020, 6, 1)).unwrap();

        let index = HistoryIndex::new(
            vec![competitor(1), competitor(2)],
            vec![
                bout(1, date(2020, 1, 1), Method::Decision, 1),
                bout(2, date(2020, 6, 1), Method::KoTko, 2),
                bout(3, date(2022, 1, 1), Method::Submission, 2),
            ],
            vec![
                landed(1, 1, 10.0),
                landed(1, 2, 5.0),
                landed(2, 1, 40.0),
                landed(2, 2, 1.0),
            ],
        );
        let after = snapshot(&index, FighterId(1), date(2020, 6, 1)).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_old_history_leaves_recent_zero() {
        let snap = snapshot(&scenario_a(), FighterId(1), date(2023, 1, 1)).unwrap();
        assert_eq!(snap.get("avg_significant_strikes_landed"), Some(10.0));
        assert_eq!(snap.get("wins"), Some(1.0));
        assert_eq!(snap.get("recent_avg_significant_strikes_landed"), Some(0.0));
        assert_eq!(snap.get("recent_wins"), Some(0.0));
        assert_eq!(snap.get("recent_dec_wins"), Some(0.0));
        assert_eq!(snap.get(RECENT_TOTAL_FIGHT_TIME), Some(0.0));
        assert_eq!(snap.get("recent_avg_significant_strikes_landed_vs_peak"), Some(0.0));
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let cutoff = date(2020, 1, 1) + Duration::days(RECENT_WINDOW_DAYS);
        let snap = snapshot(&scenario_a(), FighterId(1), cutoff).unwrap();
        assert_eq!(snap.get("recent_wins"), Some(1.0));

        let snap = snapshot(&scenario_a(), FighterId(1), cutoff + Duration::days(1)).unwrap();
        assert_eq!(snap.get("recent_wins"), Some(0.0));
    }

    #[test]
    fn test_recent_never_exceeds_full() {
        let index = HistoryIndex::new(
            vec![competitor(1), competitor(2)],
            vec![
                bout(1, date(2015, 1, 1), Method::KoTko, 1),
                bout(2, date(2018, 1, 1), Method::Submission, 2),
                bout(3, date(2019, 6, 1), Method::Decision, 1),
                bout(4, date(2020, 3, 1), Method::KoTko, 2),
            ],
            vec![],
        );
        let snap = snapshot(&index, FighterId(1), date(2020, 12, 1)).unwrap();
        assert_eq!(snap.get("wins"), Some(2.0));
        assert_eq!(snap.get("recent_wins"), Some(1.0));
        assert_eq!(snap.get("recent_losses"), Some(1.0));
        for method in Method::ALL {
            let p = method.feature_prefix();
            assert!(
                snap.get(&format!("recent_{}_wins", p)) <= snap.get(&format!("{}_wins", p))
            );
            assert!(
                snap.get(&format!("recent_{}_losses", p)) <= snap.get(&format!("{}_losses", p))
            );
        }
        assert_eq!(snap.get("ko_wins"), Some(1.0));
        assert_eq!(snap.get("ko_losses"), Some(1.0));
        assert_eq!(snap.get("ko_win_ratio"), Some(0.5));
        assert!(snap.get(RECENT_TOTAL_FIGHT_TIME) <= snap.get(TOTAL_FIGHT_TIME));
    }

    #[test]
    fn test_method_ratios_use_bouts_of_that_method() {
        let index = HistoryIndex::new(
            vec![competitor(1), competitor(2)],
            vec![
                bout(1, date(2018, 1, 1), Method::KoTko, 1),
                bout(2, date(2019, 1, 1), Method::Decision, 1),
                bout(3, date(2020, 1, 1), Method::Decision, 2),
            ],
            vec![],
        );
        let snap = snapshot(&index, FighterId(1), date(2021, 1, 1)).unwrap();

        // One KO bout, won
        assert_eq!(snap.get("ko_win_ratio"), Some(1.0));
        assert_eq!(snap.get("ko_loss_ratio"), Some(0.0));
        // Two decision bouts, split
        assert_eq!(snap.get("dec_win_ratio"), Some(0.5));
        assert_eq!(snap.get("dec_loss_ratio"), Some(0.5));
        // No submission bouts at all
        assert_eq!(snap.get("sub_win_ratio"), Some(0.0));
        assert_eq!(snap.get("sub_loss_ratio"), Some(0.0));
    }

    #[test]
    fn test_zero_peak_guards_ratio() {
        let index = HistoryIndex::new(
            vec![competitor(1), competitor(2)],
            vec![bout(1, date(2020, 1, 1), Method::Decision, 1)],
            vec![
                StatMeasurement::total(BoutId(1), FighterId(1), Category::Knockdowns, None, 0.0),
                StatMeasurement::total(BoutId(1), FighterId(2), Category::Knockdowns, None, 0.0),
            ],
        );
        let snap = snapshot(&index, FighterId(1), date(2021, 1, 1)).unwrap();
        assert_eq!(snap.get("knockdowns_peak"), Some(0.0));
        assert_eq!(snap.get("avg_knockdowns_vs_peak"), Some(0.0));
        assert_eq!(snap.get("avg_knockdowns_diff_vs_valley"), Some(0.0));
        assert!(snap.iter().all(|(_, v)| v.is_finite()));
    }

    #[test]
    fn test_peak_valley_and_ratios() {
        let index = HistoryIndex::new(
            vec![competitor(1), competitor(2)],
            vec![
                bout(1, date(2019, 1, 1), Method::Decision, 1),
                bout(2, date(2020, 1, 1), Method::Decision, 1),
            ],
            vec![
                landed(1, 1, 4.0),
                landed(1, 2, 4.0),
                landed(2, 1, 8.0),
                landed(2, 2, 2.0),
            ],
        );
        let snap = snapshot(&index, FighterId(1), date(2020, 6, 1)).unwrap();
        assert_eq!(snap.get("avg_significant_strikes_landed"), Some(6.0));
        assert_eq!(snap.get("significant_strikes_landed_peak"), Some(8.0));
        assert_eq!(snap.get("significant_strikes_landed_valley"), Some(4.0));
        assert_eq!(snap.get("avg_significant_strikes_landed_vs_peak"), Some(0.75));
        assert_eq!(snap.get("avg_significant_strikes_landed_vs_valley"), Some(1.5));
        assert_eq!(snap.get("significant_strikes_absorbed_peak"), Some(0.0));
    }

    #[test]
    fn test_guarded_ratio() {
        assert_eq!(guarded_ratio(3.0, 0.0), 0.0);
        assert_eq!(guarded_ratio(3.0, 2.0), 1.5);
    }
}
