//! Import of the raw event, result, per-round stat and tale-of-the-tape exports

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;

use crate::data::database::{Database, NewBout};
use crate::data::normalize::{
    bout_duration, collapse_whitespace, normalize_name, parse_bout_class, parse_clock,
    parse_count, parse_date, parse_height, parse_method, parse_reach, parse_round, parse_weight,
    split_bout, split_of,
};
use crate::features::catalog::{Category, Modifier};
use crate::{BoutId, FighterId, Physique, Result, StatMeasurement, WeightClass};

pub const EVENTS_FILE: &str = "ufc_event_details.csv";
pub const RESULTS_FILE: &str = "ufc_fight_results.csv";
pub const STATS_FILE: &str = "ufc_fight_stats.csv";
pub const FIGHTERS_FILE: &str = "ufc_fighter_tott.csv";

#[derive(Debug, Deserialize)]
struct EventRow {
    #[serde(rename = "EVENT")]
    event: String,
    #[serde(rename = "DATE")]
    date: String,
}

#[derive(Debug, Deserialize)]
struct ResultRow {
    #[serde(rename = "EVENT")]
    event: String,
    #[serde(rename = "BOUT")]
    bout: String,
    #[serde(rename = "OUTCOME")]
    outcome: String,
    #[serde(rename = "WEIGHTCLASS")]
    weight_class: String,
    #[serde(rename = "METHOD")]
    method: String,
    #[serde(rename = "ROUND")]
    round: String,
    #[serde(rename = "TIME")]
    time: String,
}

#[derive(Debug, Deserialize)]
struct StatRow {
    #[serde(rename = "EVENT")]
    event: String,
    #[serde(rename = "BOUT")]
    bout: String,
    #[serde(rename = "ROUND")]
    round: String,
    #[serde(rename = "FIGHTER")]
    fighter: String,
    #[serde(rename = "KD")]
    knockdowns: String,
    #[serde(rename = "SIG.STR.")]
    significant_strikes: String,
    #[serde(rename = "TOTAL STR.")]
    total_strikes: String,
    #[serde(rename = "TD")]
    takedowns: String,
    #[serde(rename = "SUB.ATT")]
    submission_attempts: String,
    #[serde(rename = "REV.")]
    reversals: String,
    #[serde(rename = "CTRL")]
    control: String,
    #[serde(rename = "HEAD")]
    head: String,
    #[serde(rename = "BODY")]
    body: String,
    #[serde(rename = "LEG")]
    leg: String,
    #[serde(rename = "DISTANCE")]
    distance: String,
    #[serde(rename = "CLINCH")]
    clinch: String,
    #[serde(rename = "GROUND")]
    ground: String,
}

impl StatRow {
    fn landed_attempted(&self) -> [(Category, &str); 9] {
        [
            (Category::TotalStrikes, self.total_strikes.as_str()),
            (Category::SignificantStrikes, self.significant_strikes.as_str()),
            (Category::Takedowns, self.takedowns.as_str()),
            (Category::HeadStrikes, self.head.as_str()),
            (Category::BodyStrikes, self.body.as_str()),
            (Category::LegStrikes, self.leg.as_str()),
            (Category::DistanceStrikes, self.distance.as_str()),
            (Category::ClinchStrikes, self.clinch.as_str()),
            (Category::GroundStrikes, self.ground.as_str()),
        ]
    }

    fn direct(&self) -> [(Category, Option<f64>); 4] {
        [
            (Category::Knockdowns, parse_count(&self.knockdowns)),
            (Category::Reversals, parse_count(&self.reversals)),
            (Category::SubmissionAttempts, parse_count(&self.submission_attempts)),
            (Category::ControlTime, parse_clock(&self.control)),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct FighterRow {
    #[serde(rename = "FIGHTER")]
    fighter: String,
    #[serde(rename = "HEIGHT")]
    height: String,
    #[serde(rename = "WEIGHT")]
    weight: String,
    #[serde(rename = "REACH")]
    reach: String,
    #[serde(rename = "DOB")]
    dob: String,
}

/// Counts reported after an import
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportSummary {
    pub fighters: usize,
    pub events: usize,
    pub bouts: usize,
    pub measurements: usize,
    pub skipped_results: usize,
    pub skipped_stats: usize,
}

/// A stored bout, found again by event and bout text
#[derive(Debug, Clone)]
struct ImportedBout {
    id: BoutId,
    participants: [(String, FighterId); 2],
}

type RoundTotals = HashMap<(Category, Option<Modifier>), f64>;

/// Loads the raw exports from one directory into a database
pub struct Importer<'a> {
    db: &'a Database,
    summary: ImportSummary,
    fighters: HashMap<String, (Option<NaiveDate>, Physique)>,
}

impl<'a> Importer<'a> {
    pub fn new(db: &'a Database) -> Self {
        Importer {
            db,
            summary: ImportSummary::default(),
            fighters: HashMap::new(),
        }
    }

    /// Import every export under `dir` in a single transaction
    pub fn import_dir(mut self, dir: &Path) -> Result<ImportSummary> {
        let db = self.db;
        let tx = db.begin()?;

        self.import_fighters(&read_rows::<FighterRow>(&dir.join(FIGHTERS_FILE))?)?;
        let events = self.read_events(&read_rows::<EventRow>(&dir.join(EVENTS_FILE))?);
        let bouts = self.import_results(&read_rows::<ResultRow>(&dir.join(RESULTS_FILE))?, &events)?;
        self.import_stats(&read_rows::<StatRow>(&dir.join(STATS_FILE))?, &bouts)?;

        tx.commit()?;
        db.update_zscores()?;

        log::info!(
            "Imported {} fighters, {} bouts, {} measurements ({} results and {} stat rows skipped)",
            self.summary.fighters,
            self.summary.bouts,
            self.summary.measurements,
            self.summary.skipped_results,
            self.summary.skipped_stats
        );
        Ok(self.summary)
    }

    fn import_fighters(&mut self, rows: &[FighterRow]) -> Result<()> {
        for row in rows {
            let name = collapse_whitespace(&row.fighter);
            if name.is_empty() {
                continue;
            }
            let physique = Physique {
                height: parse_height(&row.height),
                weight: parse_weight(&row.weight),
                reach: parse_reach(&row.reach),
            };
            let dob = parse_date(&row.dob);
            self.db.upsert_competitor(&name, dob, physique)?;
            self.fighters.insert(normalize_name(&name), (dob, physique));
            self.summary.fighters += 1;
        }
        Ok(())
    }

    fn read_events(&mut self, rows: &[EventRow]) -> HashMap<String, NaiveDate> {
        let events: HashMap<String, NaiveDate> = rows
            .iter()
            .filter_map(|row| Some((normalize_name(&row.event), parse_date(&row.date)?)))
            .collect();
        self.summary.events = events.len();
        events
    }

    fn import_results(
        &mut self,
        rows: &[ResultRow],
        events: &HashMap<String, NaiveDate>,
    ) -> Result<HashMap<(String, String), ImportedBout>> {
        let mut bouts = HashMap::new();
        for row in rows {
            match self.import_result(row, events)? {
                Some(imported) => {
                    bouts.insert((normalize_name(&row.event), normalize_name(&row.bout)), imported);
                }
                None => self.summary.skipped_results += 1,
            }
        }
        Ok(bouts)
    }

    fn import_result(
        &mut self,
        row: &ResultRow,
        events: &HashMap<String, NaiveDate>,
    ) -> Result<Option<ImportedBout>> {
        // Draws and no contests carry no winner
        let first_won = match row.outcome.trim() {
            "W/L" => true,
            "L/W" => false,
            _ => return Ok(None),
        };
        match parse_bout_class(&row.weight_class) {
            Some(class) if WeightClass::IMPORTED.contains(&class) => {}
            _ => return Ok(None),
        }
        let Some(method) = parse_method(&row.method) else {
            return Ok(None);
        };
        let Some((a, b)) = split_bout(&row.bout) else {
            return Ok(None);
        };
        let Some(&date) = events.get(&normalize_name(&row.event)) else {
            log::debug!("No date for event '{}'", row.event);
            return Ok(None);
        };
        let Some(round) = parse_round(&row.round) else {
            return Ok(None);
        };

        let a_id = self.db.get_or_create_competitor(&a)?;
        let b_id = self.db.get_or_create_competitor(&b)?;
        let id = self.db.upsert_bout(&NewBout {
            date,
            method,
            duration_secs: bout_duration(round, parse_clock(&row.time)),
            fighter: a_id,
            opponent: b_id,
            winner: if first_won { a_id } else { b_id },
        })?;
        self.summary.bouts += 1;

        for (name, fighter) in [(&a, a_id), (&b, b_id)] {
            self.record_physique(id, fighter, name, date)?;
        }

        Ok(Some(ImportedBout {
            id,
            participants: [(normalize_name(&a), a_id), (normalize_name(&b), b_id)],
        }))
    }

    /// Age and tale-of-the-tape values as of the bout
    fn record_physique(
        &mut self,
        bout: BoutId,
        fighter: FighterId,
        name: &str,
        date: NaiveDate,
    ) -> Result<()> {
        let Some(&(dob, physique)) = self.fighters.get(&normalize_name(name)) else {
            return Ok(());
        };
        let values = [
            (Category::Age, dob.map(|dob| (date - dob).num_days() as f64 / 365.25)),
            (Category::Height, physique.height),
            (Category::Weight, physique.weight),
            (Category::Reach, physique.reach),
        ];
        let measurements: Vec<StatMeasurement> = values
            .into_iter()
            .filter_map(|(category, value)| {
                Some(StatMeasurement::total(bout, fighter, category, None, value?))
            })
            .collect();
        self.summary.measurements += self.db.upsert_measurements(&measurements)?;
        Ok(())
    }

    fn import_stats(
        &mut self,
        rows: &[StatRow],
        bouts: &HashMap<(String, String), ImportedBout>,
    ) -> Result<()> {
        // Per-round rows summed per (event, bout, fighter)
        let mut totals: HashMap<(String, String, String), RoundTotals> = HashMap::new();
        for row in rows {
            if parse_round(&row.round).is_none() {
                self.summary.skipped_stats += 1;
                continue;
            }
            let key = (
                normalize_name(&row.event),
                normalize_name(&row.bout),
                normalize_name(&row.fighter),
            );
            let entry = totals.entry(key).or_default();
            for (category, cell) in row.landed_attempted() {
                if let Some((landed, attempted)) = split_of(cell) {
                    *entry.entry((category, Some(Modifier::Landed))).or_default() += landed;
                    *entry.entry((category, Some(Modifier::Attempted))).or_default() += attempted;
                }
            }
            for (category, value) in row.direct() {
                if let Some(value) = value {
                    *entry.entry((category, None)).or_default() += value;
                }
            }
        }

        for ((event, bout, fighter), values) in totals {
            let Some(imported) = bouts.get(&(event, bout)) else {
                self.summary.skipped_stats += 1;
                continue;
            };
            let Some(&(_, fighter_id)) = imported
                .participants
                .iter()
                .find(|(name, _)| *name == fighter)
            else {
                self.summary.skipped_stats += 1;
                continue;
            };
            let measurements: Vec<StatMeasurement> = values
                .into_iter()
                .map(|((category, modifier), value)| {
                    StatMeasurement::total(imported.id, fighter_id, category, modifier, value)
                })
                .collect();
            self.summary.measurements += self.db.upsert_measurements(&measurements)?;
        }
        Ok(())
    }
}

/// Import the raw exports under `dir`
pub fn import_dir(db: &Database, dir: &Path) -> Result<ImportSummary> {
    Importer::new(db).import_dir(dir)
}

/// Read every well-formed row; malformed rows are logged and skipped
fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    let mut malformed = 0usize;
    for record in reader.deserialize() {
        match record {
            Ok(row) => rows.push(row),
            Err(e) => {
                malformed += 1;
                log::debug!("{}: {}", path.display(), e);
            }
        }
    }
    if malformed > 0 {
        log::warn!("Skipped {} malformed rows in {}", malformed, path.display());
    }
    log::info!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}
