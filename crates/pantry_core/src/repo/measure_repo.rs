//! Measure and conversion-rate repository.
//!
//! # Responsibility
//! - CRUD over `measures`.
//! - Store and look up conversion rates keyed by `(from, to)`.
//!
//! # Invariants
//! - Rates are validated before writes and after reads.
//! - `set_conversion_pair` writes the forward and reciprocal rows atomically.

use crate::model::measure::{Measure, MeasureConversion, MeasureId};
use crate::repo::{
    begin_immediate, ensure_connection_ready, uuid_column, EntityKind, RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};

const REQUIRED_TABLES: &[&str] = &["measures", "measure_conversions"];

/// Repository interface for measures and conversion rates.
pub trait MeasureRepository {
    fn create_measure(&self, measure: &Measure) -> RepoResult<MeasureId>;
    fn update_measure(&self, measure: &Measure) -> RepoResult<()>;
    fn get_measure(&self, id: MeasureId) -> RepoResult<Option<Measure>>;
    /// Finds a measure whose name or abbreviation equals `label`, ignoring case.
    fn find_measure_by_label(&self, label: &str) -> RepoResult<Option<Measure>>;
    fn list_measures(&self) -> RepoResult<Vec<Measure>>;
    /// Deletes a measure; fails with `Conflict` while ingredient lines use it.
    fn delete_measure(&self, id: MeasureId) -> RepoResult<()>;
    /// Inserts or replaces one directed rate.
    fn set_conversion(&self, conversion: &MeasureConversion) -> RepoResult<()>;
    /// Inserts or replaces the directed rate and its reciprocal.
    fn set_conversion_pair(&self, conversion: &MeasureConversion) -> RepoResult<()>;
    fn get_conversion(
        &self,
        from: MeasureId,
        to: MeasureId,
    ) -> RepoResult<Option<MeasureConversion>>;
    fn list_conversions(&self, from: Option<MeasureId>) -> RepoResult<Vec<MeasureConversion>>;
    fn delete_conversion(&self, from: MeasureId, to: MeasureId) -> RepoResult<()>;
}

/// SQLite-backed measure repository.
#[derive(Clone, Copy)]
pub struct SqliteMeasureRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMeasureRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }

    fn require_measure(&self, id: MeasureId) -> RepoResult<()> {
        if self.get_measure(id)?.is_none() {
            return Err(RepoError::not_found(EntityKind::Measure, id));
        }
        Ok(())
    }
}

impl MeasureRepository for SqliteMeasureRepository<'_> {
    fn create_measure(&self, measure: &Measure) -> RepoResult<MeasureId> {
        measure.validate()?;
        self.conn.execute(
            "INSERT INTO measures (uuid, name, abbreviation) VALUES (?1, ?2, ?3);",
            params![
                measure.id.to_string(),
                measure.name.as_str(),
                measure.abbreviation.as_str()
            ],
        )?;
        Ok(measure.id)
    }

    fn update_measure(&self, measure: &Measure) -> RepoResult<()> {
        measure.validate()?;
        let changed = self.conn.execute(
            "UPDATE measures SET name = ?2, abbreviation = ?3 WHERE uuid = ?1;",
            params![
                measure.id.to_string(),
                measure.name.as_str(),
                measure.abbreviation.as_str()
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Measure, measure.id));
        }
        Ok(())
    }

    fn get_measure(&self, id: MeasureId) -> RepoResult<Option<Measure>> {
        let mut stmt = self
            .conn
            .prepare("SELECT uuid, name, abbreviation FROM measures WHERE uuid = ?1;")?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_measure_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_measure_by_label(&self, label: &str) -> RepoResult<Option<Measure>> {
        let label = label.trim().trim_end_matches('.');
        if label.is_empty() {
            return Ok(None);
        }
        let mut stmt = self.conn.prepare(
            "SELECT uuid, name, abbreviation
             FROM measures
             WHERE abbreviation = ?1 COLLATE NOCASE
                OR name = ?1 COLLATE NOCASE
             ORDER BY CASE WHEN abbreviation = ?1 COLLATE NOCASE THEN 0 ELSE 1 END
             LIMIT 1;",
        )?;
        let mut rows = stmt.query([label])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_measure_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_measures(&self) -> RepoResult<Vec<Measure>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, name, abbreviation FROM measures ORDER BY name COLLATE NOCASE ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut measures = Vec::new();
        while let Some(row) = rows.next()? {
            measures.push(parse_measure_row(row)?);
        }
        Ok(measures)
    }

    fn delete_measure(&self, id: MeasureId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM measures WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Measure, id));
        }
        Ok(())
    }

    fn set_conversion(&self, conversion: &MeasureConversion) -> RepoResult<()> {
        conversion.validate()?;
        self.require_measure(conversion.from_measure)?;
        self.require_measure(conversion.to_measure)?;
        upsert_conversion(self.conn, conversion)
    }

    fn set_conversion_pair(&self, conversion: &MeasureConversion) -> RepoResult<()> {
        conversion.validate()?;
        let inverse = conversion.inverse();
        inverse.validate()?;
        self.require_measure(conversion.from_measure)?;
        self.require_measure(conversion.to_measure)?;

        let tx = begin_immediate(self.conn)?;
        upsert_conversion(&tx, conversion)?;
        upsert_conversion(&tx, &inverse)?;
        tx.commit()?;
        Ok(())
    }

    fn get_conversion(
        &self,
        from: MeasureId,
        to: MeasureId,
    ) -> RepoResult<Option<MeasureConversion>> {
        let mut stmt = self.conn.prepare(
            "SELECT from_measure, to_measure, rate
             FROM measure_conversions
             WHERE from_measure = ?1 AND to_measure = ?2;",
        )?;
        let mut rows = stmt.query(params![from.to_string(), to.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_conversion_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_conversions(&self, from: Option<MeasureId>) -> RepoResult<Vec<MeasureConversion>> {
        let mut stmt = self.conn.prepare(
            "SELECT from_measure, to_measure, rate
             FROM measure_conversions
             WHERE ?1 IS NULL OR from_measure = ?1
             ORDER BY from_measure ASC, to_measure ASC;",
        )?;
        let mut rows = stmt.query([from.map(|id| id.to_string())])?;
        let mut conversions = Vec::new();
        while let Some(row) = rows.next()? {
            conversions.push(parse_conversion_row(row)?);
        }
        Ok(conversions)
    }

    fn delete_conversion(&self, from: MeasureId, to: MeasureId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM measure_conversions WHERE from_measure = ?1 AND to_measure = ?2;",
            params![from.to_string(), to.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::MeasureConversion, from));
        }
        Ok(())
    }
}

fn upsert_conversion(conn: &Connection, conversion: &MeasureConversion) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO measure_conversions (from_measure, to_measure, rate)
         VALUES (?1, ?2, ?3)
         ON CONFLICT (from_measure, to_measure) DO UPDATE SET rate = excluded.rate;",
        params![
            conversion.from_measure.to_string(),
            conversion.to_measure.to_string(),
            conversion.rate
        ],
    )?;
    Ok(())
}

fn parse_measure_row(row: &Row<'_>) -> RepoResult<Measure> {
    let measure = Measure {
        id: uuid_column(row, "uuid")?,
        name: row.get("name")?,
        abbreviation: row.get("abbreviation")?,
    };
    measure.validate()?;
    Ok(measure)
}

fn parse_conversion_row(row: &Row<'_>) -> RepoResult<MeasureConversion> {
    let conversion = MeasureConversion {
        from_measure: uuid_column(row, "from_measure")?,
        to_measure: uuid_column(row, "to_measure")?,
        rate: row.get("rate")?,
    };
    conversion.validate()?;
    Ok(conversion)
}
