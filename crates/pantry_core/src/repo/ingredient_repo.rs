//! Ingredient catalog repository.
//!
//! # Responsibility
//! - CRUD over `ingredients` plus owned variants and images.
//! - Record detail-view access time (`date_accessed`).
//!
//! # Invariants
//! - Ingredient names are unique case-insensitively; duplicates surface as
//!   `RepoError::Conflict`.
//! - Deleting an ingredient referenced by a recipe line is rejected by storage.

use crate::model::ingredient::{
    Ingredient, IngredientId, IngredientImage, IngredientVariant, VariantId,
};
use crate::repo::{
    ensure_connection_ready, now_epoch_ms, uuid_column, EntityKind, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const REQUIRED_TABLES: &[&str] = &["ingredients", "ingredient_variants", "ingredient_images"];

const INGREDIENT_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    description,
    date_accessed
FROM ingredients";

/// Ordering for ingredient lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IngredientSort {
    #[default]
    Name,
    RecentlyAccessed,
}

/// Query options for listing ingredients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngredientListQuery {
    /// Case-insensitive name prefix filter.
    pub name_prefix: Option<String>,
    pub sort: IngredientSort,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for ingredient catalog operations.
pub trait IngredientRepository {
    fn create_ingredient(&self, ingredient: &Ingredient) -> RepoResult<IngredientId>;
    fn update_ingredient(&self, ingredient: &Ingredient) -> RepoResult<()>;
    fn get_ingredient(&self, id: IngredientId) -> RepoResult<Option<Ingredient>>;
    fn find_ingredient_by_name(&self, name: &str) -> RepoResult<Option<Ingredient>>;
    fn list_ingredients(&self, query: &IngredientListQuery) -> RepoResult<Vec<Ingredient>>;
    fn delete_ingredient(&self, id: IngredientId) -> RepoResult<()>;
    /// Sets `date_accessed` to the current time.
    fn touch_ingredient(&self, id: IngredientId) -> RepoResult<()>;
    fn add_variant(&self, variant: &IngredientVariant) -> RepoResult<VariantId>;
    fn list_variants(&self, ingredient_id: IngredientId) -> RepoResult<Vec<IngredientVariant>>;
    fn delete_variant(&self, id: VariantId) -> RepoResult<()>;
    fn add_image(&self, image: &IngredientImage) -> RepoResult<Uuid>;
    fn list_images(&self, ingredient_id: IngredientId) -> RepoResult<Vec<IngredientImage>>;
    fn delete_image(&self, id: Uuid) -> RepoResult<()>;
}

/// SQLite-backed ingredient repository.
#[derive(Clone, Copy)]
pub struct SqliteIngredientRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteIngredientRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }

    fn require_ingredient(&self, id: IngredientId) -> RepoResult<()> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM ingredients WHERE uuid = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::not_found(EntityKind::Ingredient, id));
        }
        Ok(())
    }
}

impl IngredientRepository for SqliteIngredientRepository<'_> {
    fn create_ingredient(&self, ingredient: &Ingredient) -> RepoResult<IngredientId> {
        ingredient.validate()?;
        self.conn.execute(
            "INSERT INTO ingredients (uuid, name, description, date_accessed)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                ingredient.id.to_string(),
                ingredient.name.as_str(),
                ingredient.description.as_deref(),
                ingredient.date_accessed,
            ],
        )?;
        Ok(ingredient.id)
    }

    fn update_ingredient(&self, ingredient: &Ingredient) -> RepoResult<()> {
        ingredient.validate()?;
        let changed = self.conn.execute(
            "UPDATE ingredients
             SET
                name = ?2,
                description = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![
                ingredient.id.to_string(),
                ingredient.name.as_str(),
                ingredient.description.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Ingredient, ingredient.id));
        }
        Ok(())
    }

    fn get_ingredient(&self, id: IngredientId) -> RepoResult<Option<Ingredient>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{INGREDIENT_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_ingredient_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_ingredient_by_name(&self, name: &str) -> RepoResult<Option<Ingredient>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        let mut stmt = self.conn.prepare(&format!(
            "{INGREDIENT_SELECT_SQL} WHERE name = ?1 COLLATE NOCASE;"
        ))?;
        let mut rows = stmt.query([name])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_ingredient_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_ingredients(&self, query: &IngredientListQuery) -> RepoResult<Vec<Ingredient>> {
        let mut sql = format!("{INGREDIENT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(prefix) = query
            .name_prefix
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            sql.push_str(" AND name LIKE ? ESCAPE '\\'");
            bind_values.push(Value::Text(format!("{}%", escape_like(prefix))));
        }

        match query.sort {
            IngredientSort::Name => sql.push_str(" ORDER BY name COLLATE NOCASE ASC, uuid ASC"),
            IngredientSort::RecentlyAccessed => sql.push_str(
                " ORDER BY date_accessed IS NULL, date_accessed DESC, name COLLATE NOCASE ASC",
            ),
        }

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut ingredients = Vec::new();
        while let Some(row) = rows.next()? {
            ingredients.push(parse_ingredient_row(row)?);
        }
        Ok(ingredients)
    }

    fn delete_ingredient(&self, id: IngredientId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM ingredients WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Ingredient, id));
        }
        Ok(())
    }

    fn touch_ingredient(&self, id: IngredientId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE ingredients SET date_accessed = ?2 WHERE uuid = ?1;",
            params![id.to_string(), now_epoch_ms()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Ingredient, id));
        }
        Ok(())
    }

    fn add_variant(&self, variant: &IngredientVariant) -> RepoResult<VariantId> {
        variant.validate()?;
        self.require_ingredient(variant.ingredient_id)?;
        self.conn.execute(
            "INSERT INTO ingredient_variants (uuid, ingredient_uuid, name) VALUES (?1, ?2, ?3);",
            params![
                variant.id.to_string(),
                variant.ingredient_id.to_string(),
                variant.name.as_str(),
            ],
        )?;
        Ok(variant.id)
    }

    fn list_variants(&self, ingredient_id: IngredientId) -> RepoResult<Vec<IngredientVariant>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, ingredient_uuid, name
             FROM ingredient_variants
             WHERE ingredient_uuid = ?1
             ORDER BY name COLLATE NOCASE ASC;",
        )?;
        let mut rows = stmt.query([ingredient_id.to_string()])?;
        let mut variants = Vec::new();
        while let Some(row) = rows.next()? {
            let variant = IngredientVariant {
                id: uuid_column(row, "uuid")?,
                ingredient_id: uuid_column(row, "ingredient_uuid")?,
                name: row.get("name")?,
            };
            variant.validate()?;
            variants.push(variant);
        }
        Ok(variants)
    }

    fn delete_variant(&self, id: VariantId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM ingredient_variants WHERE uuid = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::IngredientVariant, id));
        }
        Ok(())
    }

    fn add_image(&self, image: &IngredientImage) -> RepoResult<Uuid> {
        image.validate()?;
        self.require_ingredient(image.ingredient_id)?;
        self.conn.execute(
            "INSERT INTO ingredient_images (uuid, ingredient_uuid, uri) VALUES (?1, ?2, ?3);",
            params![
                image.id.to_string(),
                image.ingredient_id.to_string(),
                image.uri.as_str(),
            ],
        )?;
        Ok(image.id)
    }

    fn list_images(&self, ingredient_id: IngredientId) -> RepoResult<Vec<IngredientImage>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, ingredient_uuid, uri
             FROM ingredient_images
             WHERE ingredient_uuid = ?1
             ORDER BY created_at ASC, rowid ASC;",
        )?;
        let mut rows = stmt.query([ingredient_id.to_string()])?;
        let mut images = Vec::new();
        while let Some(row) = rows.next()? {
            let image = IngredientImage {
                id: uuid_column(row, "uuid")?,
                ingredient_id: uuid_column(row, "ingredient_uuid")?,
                uri: row.get("uri")?,
            };
            image.validate()?;
            images.push(image);
        }
        Ok(images)
    }

    fn delete_image(&self, id: Uuid) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM ingredient_images WHERE uuid = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::IngredientImage, id));
        }
        Ok(())
    }
}

/// Escapes `%`, `_` and the escape character itself for a `LIKE` pattern.
pub(crate) fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn parse_ingredient_row(row: &Row<'_>) -> RepoResult<Ingredient> {
    let ingredient = Ingredient {
        id: uuid_column(row, "uuid")?,
        name: row.get("name")?,
        description: row.get("description")?,
        date_accessed: row.get("date_accessed")?,
    };
    ingredient.validate()?;
    Ok(ingredient)
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn escape_like_escapes_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("onion"), "onion");
    }
}
