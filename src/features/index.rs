//! In-memory bout log grouped by competitor
//!
//! Built once per batch. Each competitor keeps a date-sorted list of bout
//! positions, so a cutoff is a binary search instead of a table scan.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::data::normalize::normalize_name;
use crate::features::history::{HistoryStore, MeasurementRow, Side};
use crate::{BoutId, BoutRecord, Competitor, FighterId, MmaError, Result, StatMeasurement};

/// Immutable snapshot of the bout log
#[derive(Debug, Clone, Default)]
pub struct HistoryIndex {
    competitors: HashMap<FighterId, Competitor>,
    names: HashMap<String, FighterId>,
    /// Sorted by (date, id)
    bouts: Vec<BoutRecord>,
    /// Ascending positions into `bouts`
    by_competitor: HashMap<FighterId, Vec<usize>>,
    /// Measurements per bout, in insertion order
    measurements: HashMap<BoutId, Vec<StatMeasurement>>,
}

impl HistoryIndex {
    pub fn new(
        competitors: Vec<Competitor>,
        mut bouts: Vec<BoutRecord>,
        measurements: Vec<StatMeasurement>,
    ) -> Self {
        bouts.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        bouts.dedup_by_key(|b| b.id);

        let mut by_competitor: HashMap<FighterId, Vec<usize>> = HashMap::new();
        for (idx, bout) in bouts.iter().enumerate() {
            by_competitor.entry(bout.fighter).or_default().push(idx);
            if bout.opponent != bout.fighter {
                by_competitor.entry(bout.opponent).or_default().push(idx);
            }
        }

        let mut grouped: HashMap<BoutId, Vec<StatMeasurement>> = HashMap::new();
        for measurement in measurements {
            grouped.entry(measurement.bout).or_default().push(measurement);
        }

        let names = competitors
            .iter()
            .map(|c| (normalize_name(&c.name), c.id))
            .collect();
        let competitors = competitors.into_iter().map(|c| (c.id, c)).collect();

        HistoryIndex {
            competitors,
            names,
            bouts,
            by_competitor,
            measurements: grouped,
        }
    }

    /// All bouts in chronological order
    pub fn bouts(&self) -> &[BoutRecord] {
        &self.bouts
    }

    /// Positions of the competitor's bouts strictly before the cutoff
    fn prior_positions(&self, id: FighterId, cutoff: NaiveDate) -> &[usize] {
        match self.by_competitor.get(&id) {
            Some(positions) => {
                let end = positions.partition_point(|&idx| self.bouts[idx].date < cutoff);
                &positions[..end]
            }
            None => &[],
        }
    }
}

impl HistoryStore for HistoryIndex {
    fn competitor_by_id(&self, id: FighterId) -> Result<Competitor> {
        self.competitors
            .get(&id)
            .cloned()
            .ok_or(MmaError::CompetitorNotFound(id))
    }

    fn competitor_by_name(&self, name: &str) -> Result<Option<Competitor>> {
        Ok(self
            .names
            .get(&normalize_name(name))
            .and_then(|id| self.competitors.get(id))
            .cloned())
    }

    fn bouts_before(&self, id: FighterId, cutoff: NaiveDate) -> Result<Vec<BoutRecord>> {
        Ok(self
            .prior_positions(id, cutoff)
            .iter()
            .map(|&idx| self.bouts[idx].clone())
            .collect())
    }

    fn measurements_before(
        &self,
        id: FighterId,
        cutoff: NaiveDate,
    ) -> Result<Vec<MeasurementRow>> {
        let mut rows = Vec::new();
        for &idx in self.prior_positions(id, cutoff) {
            let bout = &self.bouts[idx];
            let Some(measurements) = self.measurements.get(&bout.id) else {
                continue;
            };
            for m in measurements {
                let side = if m.competitor == id {
                    Side::Fighter
                } else if bout.opponent_of(id) == Some(m.competitor) {
                    Side::Opponent
                } else {
                    continue;
                };
                rows.push(MeasurementRow {
                    bout: bout.id,
                    date: bout.date,
                    category: m.category,
                    modifier: m.modifier,
                    kind: m.kind,
                    value: m.value,
                    side,
                });
            }
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::catalog::{Category, Modifier};
    use crate::{Method, Physique};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn competitor(id: i64, name: &str) -> Competitor {
        Competitor {
            id: FighterId(id),
            name: name.to_string(),
            date_of_birth: None,
            weight_class: None,
            physique: Physique::default(),
            zscores: Physique::default(),
        }
    }

    fn bout(id: i64, date: NaiveDate, a: i64, b: i64) -> BoutRecord {
        BoutRecord {
            id: BoutId(id),
            date,
            method: Method::KoTko,
            duration_secs: 120.0,
            fighter: FighterId(a),
            opponent: FighterId(b),
            winner: FighterId(a),
        }
    }

    #[test]
    fn test_binary_search_cutoff() {
        let index = HistoryIndex::new(
            vec![competitor(1, "A"), competitor(2, "B")],
            // Deliberately unsorted
            vec![
                bout(3, date(2022, 1, 1), 1, 2),
                bout(1, date(2020, 1, 1), 1, 2),
                bout(2, date(2021, 1, 1), 2, 1),
            ],
            vec![],
        );

        assert_eq!(index.bouts_before(FighterId(1), date(2020, 1, 1)).unwrap().len(), 0);
        assert_eq!(index.bouts_before(FighterId(1), date(2020, 1, 2)).unwrap().len(), 1);
        assert_eq!(index.bouts_before(FighterId(2), date(2021, 6, 1)).unwrap().len(), 2);
        assert_eq!(index.bouts_before(FighterId(2), date(2030, 1, 1)).unwrap().len(), 3);
        assert!(index.bouts_before(FighterId(9), date(2030, 1, 1)).unwrap().is_empty());

        let dates: Vec<NaiveDate> = index.bouts().iter().map(|b| b.date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
    }

    #[test]
    fn test_measurement_sides() {
        let index = HistoryIndex::new(
            vec![competitor(1, "A"), competitor(2, "B"), competitor(3, "C")],
            vec![bout(1, date(2020, 1, 1), 1, 2)],
            vec![
                StatMeasurement::total(BoutId(1), FighterId(1), Category::Knockdowns, None, 1.0),
                StatMeasurement::total(BoutId(1), FighterId(2), Category::Knockdowns, None, 0.0),
                // Not a participant of bout 1
                StatMeasurement::total(BoutId(1), FighterId(3), Category::Knockdowns, None, 5.0),
                StatMeasurement::total(
                    BoutId(9),
                    FighterId(1),
                    Category::Takedowns,
                    Some(Modifier::Landed),
                    3.0,
                ),
            ],
        );

        let rows = index.measurements_before(FighterId(2), date(2021, 1, 1)).unwrap();
        assert_eq!(rows.len(), 2);
        let own = rows.iter().find(|r| r.side == Side::Fighter).unwrap();
        let opp = rows.iter().find(|r| r.side == Side::Opponent).unwrap();
        assert_eq!(own.value, 0.0);
        assert_eq!(opp.value, 1.0);
    }

    #[test]
    fn test_lookup_by_name() {
        let index = HistoryIndex::new(vec![competitor(1, "Israel  Adesanya")], vec![], vec![]);
        let found = index.competitor_by_name("israel adesanya").unwrap().unwrap();
        assert_eq!(found.id, FighterId(1));
        assert!(index.competitor_by_name("Nobody").unwrap().is_none());
        assert!(matches!(
            index.competitor_by_id(FighterId(2)),
            Err(MmaError::CompetitorNotFound(FighterId(2)))
        ));
    }
}
