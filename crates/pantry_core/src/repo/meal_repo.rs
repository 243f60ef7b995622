//! Meal log repository.
//!
//! # Invariants
//! - Tag and ingredient cross-references are replaced as whole sets.
//! - Time-range listing is inclusive of `from` and exclusive of `to`.

use crate::model::meal::{MealEntry, MealEntryId, MealEntryIngredient};
use crate::repo::tags::{load_tags, normalize_tags, replace_tags, TagOwner};
use crate::repo::{
    begin_immediate, ensure_connection_ready, optional_uuid_column, uuid_column, uuid_text,
    EntityKind, RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};

const REQUIRED_TABLES: &[&str] = &[
    "meal_entries",
    "meal_entry_tags",
    "meal_entry_ingredients",
    "tags",
];

const MEAL_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    eaten_at,
    note,
    recipe_uuid
FROM meal_entries";

/// Repository interface for meal log operations.
pub trait MealRepository {
    fn create_entry(&self, entry: &MealEntry) -> RepoResult<MealEntryId>;
    fn update_entry(&self, entry: &MealEntry) -> RepoResult<()>;
    fn get_entry(&self, id: MealEntryId) -> RepoResult<Option<MealEntry>>;
    /// Lists entries with `from <= eaten_at < to`, oldest first.
    fn list_entries_between(&self, from: i64, to: i64) -> RepoResult<Vec<MealEntry>>;
    fn delete_entry(&self, id: MealEntryId) -> RepoResult<()>;
    fn set_entry_tags(&self, id: MealEntryId, tags: &[String]) -> RepoResult<Vec<String>>;
    fn list_entry_tags(&self, id: MealEntryId) -> RepoResult<Vec<String>>;
    fn set_entry_ingredients(
        &self,
        id: MealEntryId,
        ingredients: &[MealEntryIngredient],
    ) -> RepoResult<()>;
    fn list_entry_ingredients(&self, id: MealEntryId) -> RepoResult<Vec<MealEntryIngredient>>;
}

/// SQLite-backed meal log repository.
#[derive(Clone, Copy)]
pub struct SqliteMealRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMealRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl MealRepository for SqliteMealRepository<'_> {
    fn create_entry(&self, entry: &MealEntry) -> RepoResult<MealEntryId> {
        entry.validate()?;
        self.conn.execute(
            "INSERT INTO meal_entries (uuid, name, eaten_at, note, recipe_uuid)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                entry.id.to_string(),
                entry.name.as_str(),
                entry.eaten_at,
                entry.note.as_deref(),
                uuid_text(entry.recipe_id),
            ],
        )?;
        Ok(entry.id)
    }

    fn update_entry(&self, entry: &MealEntry) -> RepoResult<()> {
        entry.validate()?;
        let changed = self.conn.execute(
            "UPDATE meal_entries
             SET name = ?2, eaten_at = ?3, note = ?4, recipe_uuid = ?5
             WHERE uuid = ?1;",
            params![
                entry.id.to_string(),
                entry.name.as_str(),
                entry.eaten_at,
                entry.note.as_deref(),
                uuid_text(entry.recipe_id),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::MealEntry, entry.id));
        }
        Ok(())
    }

    fn get_entry(&self, id: MealEntryId) -> RepoResult<Option<MealEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MEAL_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_entry_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_entries_between(&self, from: i64, to: i64) -> RepoResult<Vec<MealEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MEAL_SELECT_SQL}
             WHERE eaten_at >= ?1 AND eaten_at < ?2
             ORDER BY eaten_at ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query(params![from, to])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_entry_row(row)?);
        }
        Ok(entries)
    }

    fn delete_entry(&self, id: MealEntryId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM meal_entries WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::MealEntry, id));
        }
        Ok(())
    }

    fn set_entry_tags(&self, id: MealEntryId, tags: &[String]) -> RepoResult<Vec<String>> {
        let normalized = normalize_tags(tags)?;
        let entry_uuid = id.to_string();
        let tx = begin_immediate(self.conn)?;
        if !entry_exists(&tx, &entry_uuid)? {
            return Err(RepoError::not_found(EntityKind::MealEntry, id));
        }
        replace_tags(&tx, TagOwner::MealEntry, &entry_uuid, &normalized)?;
        tx.commit()?;
        Ok(normalized)
    }

    fn list_entry_tags(&self, id: MealEntryId) -> RepoResult<Vec<String>> {
        load_tags(self.conn, TagOwner::MealEntry, &id.to_string())
    }

    fn set_entry_ingredients(
        &self,
        id: MealEntryId,
        ingredients: &[MealEntryIngredient],
    ) -> RepoResult<()> {
        for ingredient in ingredients {
            ingredient.validate()?;
        }

        let entry_uuid = id.to_string();
        let tx = begin_immediate(self.conn)?;
        if !entry_exists(&tx, &entry_uuid)? {
            return Err(RepoError::not_found(EntityKind::MealEntry, id));
        }

        tx.execute(
            "DELETE FROM meal_entry_ingredients WHERE meal_entry_uuid = ?1;",
            [entry_uuid.as_str()],
        )?;
        for (position, ingredient) in ingredients.iter().enumerate() {
            tx.execute(
                "INSERT INTO meal_entry_ingredients (
                    meal_entry_uuid,
                    ingredient_uuid,
                    quantity,
                    measure_uuid,
                    position
                ) VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    entry_uuid.as_str(),
                    ingredient.ingredient_id.to_string(),
                    ingredient.quantity,
                    uuid_text(ingredient.measure_id),
                    position,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn list_entry_ingredients(&self, id: MealEntryId) -> RepoResult<Vec<MealEntryIngredient>> {
        let mut stmt = self.conn.prepare(
            "SELECT ingredient_uuid, quantity, measure_uuid
             FROM meal_entry_ingredients
             WHERE meal_entry_uuid = ?1
             ORDER BY position ASC;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut ingredients = Vec::new();
        while let Some(row) = rows.next()? {
            let ingredient = MealEntryIngredient {
                ingredient_id: uuid_column(row, "ingredient_uuid")?,
                quantity: row.get("quantity")?,
                measure_id: optional_uuid_column(row, "measure_uuid")?,
            };
            ingredient.validate()?;
            ingredients.push(ingredient);
        }
        Ok(ingredients)
    }
}

fn entry_exists(conn: &Connection, entry_uuid: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM meal_entries WHERE uuid = ?1);",
        [entry_uuid],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_entry_row(row: &Row<'_>) -> RepoResult<MealEntry> {
    let entry = MealEntry {
        id: uuid_column(row, "uuid")?,
        name: row.get("name")?,
        eaten_at: row.get("eaten_at")?,
        note: row.get("note")?,
        recipe_id: optional_uuid_column(row, "recipe_uuid")?,
    };
    entry.validate()?;
    Ok(entry)
}
