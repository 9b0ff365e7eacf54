//! Feature table assembly
//!
//! Training rows come in pairs, one per side of every historical bout, each
//! computed as of that bout's date. Inference rows describe a hypothetical
//! pairing on an arbitrary date and carry no outcome.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use crate::features::aggregator::{aggregate, snapshot};
use crate::features::history::{FighterHistory, HistoryStore};
use crate::features::index::HistoryIndex;
use crate::features::matchup::{diff_vector, MatchupVector};
use crate::{BoutId, BoutRecord, FighterId, MmaError, Result};

/// Identifying columns written before the feature columns
pub const ID_COLUMNS: [&str; 5] = ["date", "fighter_id", "opponent_id", "bout_id", "outcome"];

/// One output row
#[derive(Debug, Clone, Serialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub fighter: FighterId,
    pub opponent: FighterId,
    pub bout: Option<BoutId>,
    /// 1.0 if `fighter` won, 0.0 if they lost, absent for inference rows
    pub outcome: Option<f64>,
    pub features: MatchupVector,
}

/// Build one row for `fighter` against `opponent`, as of `date`
pub fn matchup_row<S: HistoryStore + ?Sized>(
    store: &S,
    fighter: FighterId,
    opponent: FighterId,
    date: NaiveDate,
) -> Result<FeatureRow> {
    let own = snapshot(store, fighter, date)?;
    let theirs = snapshot(store, opponent, date)?;
    Ok(FeatureRow {
        date,
        fighter,
        opponent,
        bout: None,
        outcome: None,
        features: diff_vector(&own, &theirs),
    })
}

/// Builds training rows from an in-memory index
pub struct FeatureAssembler<'a> {
    index: &'a HistoryIndex,
    parallel: bool,
    since: Option<NaiveDate>,
}

impl<'a> FeatureAssembler<'a> {
    pub fn new(index: &'a HistoryIndex) -> Self {
        FeatureAssembler {
            index,
            parallel: true,
            since: None,
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Only emit rows for bouts on or after this date
    pub fn since(mut self, since: Option<NaiveDate>) -> Self {
        self.since = since;
        self
    }

    /// Two rows per qualifying bout, in chronological order
    pub fn training_rows(&self) -> Result<Vec<FeatureRow>> {
        let bouts: Vec<&BoutRecord> = self
            .index
            .bouts()
            .iter()
            .filter(|b| self.since.map_or(true, |since| b.date >= since))
            .collect();

        log::info!(
            "Assembling features for {} bouts ({})",
            bouts.len(),
            if self.parallel { "parallel" } else { "sequential" }
        );

        let per_bout: Vec<Vec<FeatureRow>> = if self.parallel {
            bouts
                .par_iter()
                .map(|bout| self.rows_for_bout(bout))
                .collect::<Result<_>>()?
        } else {
            bouts
                .iter()
                .map(|bout| self.rows_for_bout(bout))
                .collect::<Result<_>>()?
        };

        let rows: Vec<FeatureRow> = per_bout.into_iter().flatten().collect();
        log::info!("Assembled {} rows", rows.len());
        Ok(rows)
    }

    fn rows_for_bout(&self, bout: &BoutRecord) -> Result<Vec<FeatureRow>> {
        let snapshots = snapshot(self.index, bout.fighter, bout.date).and_then(|a| {
            snapshot(self.index, bout.opponent, bout.date).map(|b| (a, b))
        });
        let (a, b) = match snapshots {
            Ok(pair) => pair,
            Err(MmaError::CompetitorNotFound(id)) => {
                log::warn!("Skipping {}: {} is not in the index", bout.id, id);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let outcome = |id: FighterId| Some(if bout.winner == id { 1.0 } else { 0.0 });
        Ok(vec![
            FeatureRow {
                date: bout.date,
                fighter: bout.fighter,
                opponent: bout.opponent,
                bout: Some(bout.id),
                outcome: outcome(bout.fighter),
                features: diff_vector(&a, &b),
            },
            FeatureRow {
                date: bout.date,
                fighter: bout.opponent,
                opponent: bout.fighter,
                bout: Some(bout.id),
                outcome: outcome(bout.opponent),
                features: diff_vector(&b, &a),
            },
        ])
    }
}

/// Every feature column a row can carry, sorted
pub fn feature_columns() -> Vec<String> {
    let empty = aggregate(&FighterHistory {
        fighter: FighterId(0),
        before: NaiveDate::MIN,
        bouts: Vec::new(),
    });
    diff_vector(&empty, &empty).into_keys().collect()
}

/// Write rows as CSV with the identifying columns first
pub fn write_csv<W: Write>(rows: &[FeatureRow], writer: W) -> Result<()> {
    let mut columns: BTreeSet<String> = feature_columns().into_iter().collect();
    for row in rows {
        columns.extend(row.features.keys().cloned());
    }

    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(
        ID_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(columns.iter().cloned()),
    )?;

    for row in rows {
        let mut record = vec![
            row.date.format("%Y-%m-%d").to_string(),
            row.fighter.0.to_string(),
            row.opponent.0.to_string(),
            row.bout.map(|b| b.0.to_string()).unwrap_or_default(),
            row.outcome.map(|o| o.to_string()).unwrap_or_default(),
        ];
        record.extend(
            columns
                .iter()
                .map(|c| row.features.get(c).copied().unwrap_or(0.0).to_string()),
        );
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write rows to a CSV file, creating parent directories
pub fn write_csv_file(rows: &[FeatureRow], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(path)?;
    write_csv(rows, std::io::BufWriter::new(file))
}
