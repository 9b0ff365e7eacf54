//! Raw history extraction
//!
//! Rebuilds the bouts a fighter had completed before a cutoff date, with each
//! measurement attributed to the fighter or to that bout's opponent.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::features::catalog::{Category, Modifier, StatKind};
use crate::{BoutId, BoutRecord, Competitor, FighterId, Result};

/// Which competitor produced a measurement, relative to the queried fighter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Fighter,
    Opponent,
}

/// A stored measurement seen from one competitor's perspective
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRow {
    pub bout: BoutId,
    pub date: NaiveDate,
    pub category: Category,
    pub modifier: Option<Modifier>,
    pub kind: StatKind,
    pub value: f64,
    pub side: Side,
}

/// Read-only access to the bout log
pub trait HistoryStore {
    /// Resolve a competitor, failing with `CompetitorNotFound` for unknown ids
    fn competitor_by_id(&self, id: FighterId) -> Result<Competitor>;

    /// Resolve a competitor by name
    fn competitor_by_name(&self, name: &str) -> Result<Option<Competitor>>;

    /// Bouts the competitor took part in strictly before the cutoff
    fn bouts_before(&self, id: FighterId, cutoff: NaiveDate) -> Result<Vec<BoutRecord>>;

    /// Measurements from those bouts, for both sides
    fn measurements_before(&self, id: FighterId, cutoff: NaiveDate)
        -> Result<Vec<MeasurementRow>>;
}

/// Raw totals recorded for one side of one bout
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoutStats {
    values: HashMap<(Category, Option<Modifier>), f64>,
}

impl BoutStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value; a later value for the same slot replaces the earlier one
    pub fn insert(&mut self, category: Category, modifier: Option<Modifier>, value: f64) {
        self.values.insert((category, modifier), value);
    }

    pub fn get(&self, category: Category, modifier: Option<Modifier>) -> Option<f64> {
        self.values.get(&(category, modifier)).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One prior bout with both sides' measurements
#[derive(Debug, Clone)]
pub struct BoutHistory {
    pub bout: BoutRecord,
    pub own: BoutStats,
    pub opponent: BoutStats,
}

/// A fighter's bouts before a cutoff, most recent first
#[derive(Debug, Clone)]
pub struct FighterHistory {
    pub fighter: FighterId,
    pub before: NaiveDate,
    pub bouts: Vec<BoutHistory>,
}

impl FighterHistory {
    pub fn len(&self) -> usize {
        self.bouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bouts.is_empty()
    }

    /// Bouts on or after `since`, a prefix of the most-recent-first list
    pub fn since(&self, since: NaiveDate) -> &[BoutHistory] {
        let end = self.bouts.partition_point(|b| b.bout.date >= since);
        &self.bouts[..end]
    }
}

/// Collect the fighter's history strictly before `before`
pub fn extract_history<S: HistoryStore + ?Sized>(
    store: &S,
    fighter: FighterId,
    before: NaiveDate,
) -> Result<FighterHistory> {
    store.competitor_by_id(fighter)?;

    let mut bouts: Vec<BoutRecord> = store
        .bouts_before(fighter, before)?
        .into_iter()
        .filter(|b| b.date < before && b.involves(fighter))
        .collect();
    bouts.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
    bouts.dedup_by_key(|b| b.id);

    let positions: HashMap<BoutId, usize> = bouts
        .iter()
        .enumerate()
        .map(|(idx, b)| (b.id, idx))
        .collect();

    let mut history: Vec<BoutHistory> = bouts
        .into_iter()
        .map(|bout| BoutHistory {
            bout,
            own: BoutStats::new(),
            opponent: BoutStats::new(),
        })
        .collect();

    let mut ignored = 0usize;
    for row in store.measurements_before(fighter, before)? {
        if row.kind != StatKind::Total || row.date >= before {
            ignored += 1;
            continue;
        }
        let Some(&idx) = positions.get(&row.bout) else {
            ignored += 1;
            continue;
        };
        let entry = &mut history[idx];
        match row.side {
            Side::Fighter => entry.own.insert(row.category, row.modifier, row.value),
            Side::Opponent => entry.opponent.insert(row.category, row.modifier, row.value),
        }
    }
    if ignored > 0 {
        log::debug!(
            "Ignored {} measurement rows outside {}'s history before {}",
            ignored,
            fighter,
            before
        );
    }

    Ok(FighterHistory {
        fighter,
        before,
        bouts: history,
    })
}
