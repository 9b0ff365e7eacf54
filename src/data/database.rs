//! SQLite database management for bout data

use crate::data::normalize::{mean_and_std, normalize_name};
use crate::features::catalog::{Category, Modifier, StatKind};
use crate::features::history::{HistoryStore, MeasurementRow, Side};
use crate::features::HistoryIndex;
use crate::{
    BoutId, BoutRecord, Competitor, FighterId, Method, MmaError, Physique, Result,
    StatMeasurement, WeightClass,
};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::collections::HashMap;
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

const COMPETITOR_COLUMNS: &str = "id, name, date_of_birth, weight_class, height, weight, reach, \
     height_z, weight_z, reach_z";

const BOUT_COLUMNS: &str = "id, date, method, duration, fighter_id, opponent_id, winner_id";

/// A bout to be stored; the id is assigned by the database
#[derive(Debug, Clone, PartialEq)]
pub struct NewBout {
    pub date: NaiveDate,
    pub method: Method,
    pub duration_secs: f64,
    pub fighter: FighterId,
    pub opponent: FighterId,
    pub winner: FighterId,
}

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS fighters (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                name_key TEXT NOT NULL UNIQUE,
                date_of_birth TEXT,
                weight_class TEXT,
                height REAL,
                weight REAL,
                reach REAL,
                height_z REAL,
                weight_z REAL,
                reach_z REAL
            );

            CREATE TABLE IF NOT EXISTS fights (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                method TEXT NOT NULL,
                duration REAL NOT NULL,
                fighter_id INTEGER NOT NULL REFERENCES fighters(id),
                opponent_id INTEGER NOT NULL REFERENCES fighters(id),
                winner_id INTEGER NOT NULL REFERENCES fighters(id),
                low_id INTEGER NOT NULL,
                high_id INTEGER NOT NULL,
                UNIQUE(date, low_id, high_id)
            );

            CREATE TABLE IF NOT EXISTS fight_stats (
                fight_id INTEGER NOT NULL REFERENCES fights(id),
                fighter_id INTEGER NOT NULL REFERENCES fighters(id),
                category TEXT NOT NULL,
                modifier TEXT NOT NULL DEFAULT '',
                kind TEXT NOT NULL,
                value REAL NOT NULL,
                UNIQUE(fight_id, fighter_id, category, modifier, kind)
            );

            CREATE INDEX IF NOT EXISTS idx_fights_date ON fights(date);
            CREATE INDEX IF NOT EXISTS idx_fights_fighter ON fights(fighter_id);
            CREATE INDEX IF NOT EXISTS idx_fights_opponent ON fights(opponent_id);
            CREATE INDEX IF NOT EXISTS idx_fight_stats_fight ON fight_stats(fight_id);
            "#,
        )?;
        Ok(())
    }

    /// Start a transaction on the shared connection; dropped without commit rolls back
    pub fn begin(&self) -> Result<Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    // ==================== Competitor Operations ====================

    /// Insert or update a competitor keyed by normalized name
    pub fn upsert_competitor(
        &self,
        name: &str,
        date_of_birth: Option<NaiveDate>,
        physique: Physique,
    ) -> Result<FighterId> {
        let weight_class = physique.weight.map(|w| WeightClass::from_weight(w).code());
        self.conn.execute(
            r#"
            INSERT INTO fighters (name, name_key, date_of_birth, weight_class, height, weight, reach)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(name_key) DO UPDATE SET
                name = excluded.name,
                date_of_birth = COALESCE(excluded.date_of_birth, date_of_birth),
                weight_class = COALESCE(excluded.weight_class, weight_class),
                height = COALESCE(excluded.height, height),
                weight = COALESCE(excluded.weight, weight),
                reach = COALESCE(excluded.reach, reach)
            "#,
            params![
                name,
                normalize_name(name),
                date_of_birth.map(|d| d.format(DATE_FORMAT).to_string()),
                weight_class,
                physique.height,
                physique.weight,
                physique.reach,
            ],
        )?;
        self.competitor_id(name)?
            .ok_or_else(|| MmaError::UnknownCompetitor(name.to_string()))
    }

    /// Get or create a competitor known only by name
    pub fn get_or_create_competitor(&self, name: &str) -> Result<FighterId> {
        if let Some(id) = self.competitor_id(name)? {
            return Ok(id);
        }
        self.conn.execute(
            "INSERT INTO fighters (name, name_key) VALUES (?1, ?2)",
            params![name, normalize_name(name)],
        )?;
        Ok(FighterId(self.conn.last_insert_rowid()))
    }

    fn competitor_id(&self, name: &str) -> Result<Option<FighterId>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM fighters WHERE name_key = ?1",
                params![normalize_name(name)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.map(FighterId))
    }

    /// Get competitor by ID
    pub fn get_competitor(&self, id: FighterId) -> Result<Competitor> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM fighters WHERE id = ?1", COMPETITOR_COLUMNS),
                params![id.0],
                Self::row_to_competitor,
            )
            .optional()?
            .ok_or(MmaError::CompetitorNotFound(id))
    }

    /// Find a competitor by name, ignoring case and spacing
    pub fn find_competitor_by_name(&self, name: &str) -> Result<Option<Competitor>> {
        let competitor = self
            .conn
            .query_row(
                &format!("SELECT {} FROM fighters WHERE name_key = ?1", COMPETITOR_COLUMNS),
                params![normalize_name(name)],
                Self::row_to_competitor,
            )
            .optional()?;
        Ok(competitor)
    }

    /// Get all competitors
    pub fn get_all_competitors(&self) -> Result<Vec<Competitor>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM fighters ORDER BY id",
            COMPETITOR_COLUMNS
        ))?;
        let competitors = stmt
            .query_map([], Self::row_to_competitor)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(competitors)
    }

    /// Recompute height/weight/reach z-scores within each weight class.
    /// Classes with fewer than two values or zero spread are left unscored.
    pub fn update_zscores(&self) -> Result<usize> {
        let competitors = self.get_all_competitors()?;

        let mut classes: HashMap<WeightClass, Vec<&Competitor>> = HashMap::new();
        for competitor in &competitors {
            if let Some(class) = competitor.weight_class {
                classes.entry(class).or_default().push(competitor);
            }
        }

        let tx = self.begin()?;
        tx.execute(
            "UPDATE fighters SET height_z = NULL, weight_z = NULL, reach_z = NULL",
            [],
        )?;

        let fields: [(&str, fn(&Physique) -> Option<f64>); 3] = [
            ("height_z", |p| p.height),
            ("weight_z", |p| p.weight),
            ("reach_z", |p| p.reach),
        ];
        let mut updated = 0;
        for (class, members) in &classes {
            for (column, field) in fields {
                let values: Vec<f64> = members.iter().filter_map(|c| field(&c.physique)).collect();
                let Some((mean, std)) = mean_and_std(&values) else {
                    continue;
                };
                if std == 0.0 {
                    log::debug!("Skipping {} for {}: zero spread", column, class.code());
                    continue;
                }
                for competitor in members {
                    if let Some(value) = field(&competitor.physique) {
                        tx.execute(
                            &format!("UPDATE fighters SET {} = ?1 WHERE id = ?2", column),
                            params![(value - mean) / std, competitor.id.0],
                        )?;
                        updated += 1;
                    }
                }
            }
        }
        tx.commit()?;

        log::info!("Updated {} z-scores across {} weight classes", updated, classes.len());
        Ok(updated)
    }

    fn row_to_competitor(row: &rusqlite::Row) -> rusqlite::Result<Competitor> {
        let date_of_birth: Option<String> = row.get(2)?;
        let weight_class: Option<String> = row.get(3)?;
        Ok(Competitor {
            id: FighterId(row.get(0)?),
            name: row.get(1)?,
            date_of_birth: date_of_birth
                .map(|s| parse_stored_date(2, &s))
                .transpose()?,
            weight_class: weight_class.as_deref().and_then(WeightClass::from_code),
            physique: Physique {
                height: row.get(4)?,
                weight: row.get(5)?,
                reach: row.get(6)?,
            },
            zscores: Physique {
                height: row.get(7)?,
                weight: row.get(8)?,
                reach: row.get(9)?,
            },
        })
    }

    // ==================== Bout Operations ====================

    /// Insert or update a bout; the pair may be given in either order
    pub fn upsert_bout(&self, bout: &NewBout) -> Result<BoutId> {
        let date = bout.date.format(DATE_FORMAT).to_string();
        let low = bout.fighter.0.min(bout.opponent.0);
        let high = bout.fighter.0.max(bout.opponent.0);
        self.conn.execute(
            r#"
            INSERT INTO fights (date, method, duration, fighter_id, opponent_id, winner_id,
                                low_id, high_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(date, low_id, high_id) DO UPDATE SET
                method = excluded.method,
                duration = excluded.duration,
                fighter_id = excluded.fighter_id,
                opponent_id = excluded.opponent_id,
                winner_id = excluded.winner_id
            "#,
            params![
                date,
                bout.method.as_str(),
                bout.duration_secs,
                bout.fighter.0,
                bout.opponent.0,
                bout.winner.0,
                low,
                high,
            ],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM fights WHERE date = ?1 AND low_id = ?2 AND high_id = ?3",
            params![date, low, high],
            |row| row.get(0),
        )?;
        Ok(BoutId(id))
    }

    /// Get all bouts in chronological order
    pub fn get_all_bouts(&self) -> Result<Vec<BoutRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM fights ORDER BY date, id",
            BOUT_COLUMNS
        ))?;
        let bouts = stmt
            .query_map([], Self::row_to_bout)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(bouts)
    }

    fn row_to_bout(row: &rusqlite::Row) -> rusqlite::Result<BoutRecord> {
        let date: String = row.get(1)?;
        let method: String = row.get(2)?;
        Ok(BoutRecord {
            id: BoutId(row.get(0)?),
            date: parse_stored_date(1, &date)?,
            method: Method::from_str_opt(&method)
                .ok_or_else(|| conversion_error(2, format!("unknown method {}", method)))?,
            duration_secs: row.get(3)?,
            fighter: FighterId(row.get(4)?),
            opponent: FighterId(row.get(5)?),
            winner: FighterId(row.get(6)?),
        })
    }

    // ==================== Measurement Operations ====================

    /// Insert or replace one measurement
    pub fn upsert_measurement(&self, m: &StatMeasurement) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO fight_stats (fight_id, fighter_id, category, modifier, kind, value)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(fight_id, fighter_id, category, modifier, kind) DO UPDATE SET
                value = excluded.value
            "#,
            params![
                m.bout.0,
                m.competitor.0,
                m.category.code(),
                m.modifier.map(|m| m.code()).unwrap_or(""),
                m.kind.code(),
                m.value,
            ],
        )?;
        Ok(())
    }

    /// Insert multiple measurements
    pub fn upsert_measurements(&self, measurements: &[StatMeasurement]) -> Result<usize> {
        let mut count = 0;
        for m in measurements {
            self.upsert_measurement(m)?;
            count += 1;
        }
        Ok(count)
    }

    /// Get all measurements; rows with unrecognised codes are dropped
    pub fn get_all_measurements(&self) -> Result<Vec<StatMeasurement>> {
        let mut stmt = self.conn.prepare(
            "SELECT fight_id, fighter_id, category, modifier, kind, value FROM fight_stats",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let category: String = row.get(2)?;
                let modifier: String = row.get(3)?;
                let kind: String = row.get(4)?;
                let measurement = match decode_codes(&category, &modifier, &kind) {
                    Some((category, modifier, kind)) => Some(StatMeasurement {
                        bout: BoutId(row.get(0)?),
                        competitor: FighterId(row.get(1)?),
                        category,
                        modifier,
                        kind,
                        value: row.get(5)?,
                    }),
                    None => None,
                };
                Ok(measurement)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().flatten().collect())
    }

    /// Snapshot the whole store into memory
    pub fn load_index(&self) -> Result<HistoryIndex> {
        let competitors = self.get_all_competitors()?;
        let bouts = self.get_all_bouts()?;
        let measurements = self.get_all_measurements()?;
        log::info!(
            "Loaded {} competitors, {} bouts, {} measurements",
            competitors.len(),
            bouts.len(),
            measurements.len()
        );
        Ok(HistoryIndex::new(competitors, bouts, measurements))
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let competitor_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM fighters", [], |row| row.get(0))?;

        let bout_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM fights", [], |row| row.get(0))?;

        let measurement_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM fight_stats", [], |row| row.get(0))?;

        let (min_date, max_date): (Option<String>, Option<String>) = self.conn.query_row(
            "SELECT MIN(date), MAX(date) FROM fights",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(DatabaseStats {
            competitor_count: competitor_count as usize,
            bout_count: bout_count as usize,
            measurement_count: measurement_count as usize,
            earliest_bout: min_date.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok()),
            latest_bout: max_date.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok()),
        })
    }
}

impl HistoryStore for Database {
    fn competitor_by_id(&self, id: FighterId) -> Result<Competitor> {
        self.get_competitor(id)
    }

    fn competitor_by_name(&self, name: &str) -> Result<Option<Competitor>> {
        self.find_competitor_by_name(name)
    }

    fn bouts_before(&self, id: FighterId, cutoff: NaiveDate) -> Result<Vec<BoutRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM fights
             WHERE (fighter_id = ?1 OR opponent_id = ?1) AND date < ?2
             ORDER BY date DESC, id DESC",
            BOUT_COLUMNS
        ))?;
        let bouts = stmt
            .query_map(
                params![id.0, cutoff.format(DATE_FORMAT).to_string()],
                Self::row_to_bout,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(bouts)
    }

    fn measurements_before(
        &self,
        id: FighterId,
        cutoff: NaiveDate,
    ) -> Result<Vec<MeasurementRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.fight_id, f.date, s.category, s.modifier, s.kind, s.value,
                    s.fighter_id, f.fighter_id, f.opponent_id
             FROM fight_stats s JOIN fights f ON f.id = s.fight_id
             WHERE (f.fighter_id = ?1 OR f.opponent_id = ?1) AND f.date < ?2",
        )?;
        let rows = stmt
            .query_map(
                params![id.0, cutoff.format(DATE_FORMAT).to_string()],
                |row| {
                    let date: String = row.get(1)?;
                    let category: String = row.get(2)?;
                    let modifier: String = row.get(3)?;
                    let kind: String = row.get(4)?;
                    let producer: i64 = row.get(6)?;
                    let participants: (i64, i64) = (row.get(7)?, row.get(8)?);

                    let side = if producer == id.0 {
                        Side::Fighter
                    } else if producer == participants.0 || producer == participants.1 {
                        Side::Opponent
                    } else {
                        return Ok(None);
                    };
                    let Some((category, modifier, kind)) =
                        decode_codes(&category, &modifier, &kind)
                    else {
                        return Ok(None);
                    };
                    Ok(Some(MeasurementRow {
                        bout: BoutId(row.get(0)?),
                        date: parse_stored_date(1, &date)?,
                        category,
                        modifier,
                        kind,
                        value: row.get(5)?,
                        side,
                    }))
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().flatten().collect())
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub competitor_count: usize,
    pub bout_count: usize,
    pub measurement_count: usize,
    pub earliest_bout: Option<NaiveDate>,
    pub latest_bout: Option<NaiveDate>,
}

fn decode_codes(
    category: &str,
    modifier: &str,
    kind: &str,
) -> Option<(Category, Option<Modifier>, StatKind)> {
    let category = Category::from_code(category)?;
    let modifier = match modifier {
        "" => None,
        code => Some(Modifier::from_code(code)?),
    };
    let kind = StatKind::from_code(kind)?;
    Some((category, modifier, kind))
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn parse_stored_date(idx: usize, s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
