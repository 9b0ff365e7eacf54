//! Fighter vs. opponent differencing

use std::collections::BTreeMap;

use crate::features::aggregator::FighterSnapshot;
use crate::features::catalog::{Aggregate, TRACKED_KEYS};

pub const FIGHTER_PREFIX: &str = "precomp_";
pub const OPPONENT_PREFIX: &str = "opponent_precomp_";
pub const VS_OPPONENT_SUFFIX: &str = "_vs_opp";

/// Flat matchup features keyed by rendered name
pub type MatchupVector = BTreeMap<String, f64>;

/// Names of the aggregates that get a `_vs_opp` difference
pub fn compared_features() -> impl Iterator<Item = String> {
    TRACKED_KEYS
        .iter()
        .filter(|key| key.compared_against_opponent())
        .flat_map(|key| Aggregate::COMPARED.into_iter().map(move |agg| key.name(agg)))
}

/// Combine two snapshots into one prefixed vector
pub fn diff_vector(fighter: &FighterSnapshot, opponent: &FighterSnapshot) -> MatchupVector {
    let mut vector = MatchupVector::new();

    for (name, value) in fighter.iter() {
        vector.insert(format!("{}{}", FIGHTER_PREFIX, name), *value);
    }
    for (name, value) in opponent.iter() {
        vector.insert(format!("{}{}", OPPONENT_PREFIX, name), *value);
    }
    for name in compared_features() {
        let own = fighter.get(&name).unwrap_or(0.0);
        let theirs = opponent.get(&name).unwrap_or(0.0);
        vector.insert(
            format!("{}{}{}", FIGHTER_PREFIX, name, VS_OPPONENT_SUFFIX),
            own - theirs,
        );
    }

    vector
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FighterId;
    use chrono::NaiveDate;

    fn make_snapshot(id: i64, values: &[(&str, f64)]) -> FighterSnapshot {
        FighterSnapshot {
            fighter: FighterId(id),
            as_of: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            features: values.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn test_round_trip() {
        let a = make_snapshot(1, &[("avg_takedowns_landed", 3.0), ("wins", 4.0)]);
        let b = make_snapshot(2, &[("avg_takedowns_landed", 1.0), ("wins", 2.0)]);
        let vector = diff_vector(&a, &b);

        assert_eq!(vector.get("precomp_avg_takedowns_landed"), Some(&3.0));
        assert_eq!(vector.get("opponent_precomp_avg_takedowns_landed"), Some(&1.0));
        assert_eq!(vector.get("precomp_avg_takedowns_landed_vs_opp"), Some(&2.0));
        assert_eq!(vector.get("precomp_wins"), Some(&4.0));
        // Outcome counts are not differenced
        assert!(vector.get("precomp_wins_vs_opp").is_none());
    }

    #[test]
    fn test_swap_negates() {
        let a = make_snapshot(1, &[("control_time_peak", 300.0), ("avg_reach", 74.0)]);
        let b = make_snapshot(2, &[("control_time_peak", 120.0), ("avg_reach", 70.0)]);
        let ab = diff_vector(&a, &b);
        let ba = diff_vector(&b, &a);

        for name in compared_features() {
            let key = format!("precomp_{}_vs_opp", name);
            assert_eq!(ab[&key], -ba[&key], "{}", key);
        }
        assert_eq!(ab["precomp_avg_reach"], ba["opponent_precomp_avg_reach"]);
        assert_eq!(ab["precomp_control_time_peak_vs_opp"], 180.0);
    }

    #[test]
    fn test_absorbed_diff_not_compared() {
        let names: Vec<String> = compared_features().collect();
        assert!(names.contains(&"avg_head_strikes_absorbed".to_string()));
        assert!(names.contains(&"recent_avg_takedowns_landed_diff".to_string()));
        assert!(!names.contains(&"avg_head_strikes_absorbed_diff".to_string()));
        assert!(!names.contains(&"avg_head_strikes_landed_vs_peak".to_string()));
        assert_eq!(names.len(), (9 * 6 + 8 * 2) * 4);
    }
}
