//! Recipe repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - CRUD over `recipes`.
//! - Own replace-all semantics for instructions, ingredient lines and tags.
//! - Maintain the `times_made` / `date_accessed` counters.
//!
//! # Invariants
//! - Replace-all writes run in one immediate transaction; a failure leaves
//!   the previous children untouched.
//! - Child positions are rewritten densely from 0 on every replace.
//! - `update_recipe` never changes the counters; only `mark_made` and
//!   `touch_recipe` do.

use crate::model::ingredient::IngredientId;
use crate::model::recipe::{
    Instruction, InstructionSection, Recipe, RecipeId, RecipeImage, RecipeIngredient,
    RecipeIngredientDraft, SectionDraft,
};
use crate::repo::tags::{list_all_tags, load_tags, normalize_tags, replace_tags, TagOwner};
use crate::repo::{
    begin_immediate, ensure_connection_ready, now_epoch_ms, optional_u32_column,
    optional_uuid_column, u32_column, uuid_column, uuid_text, EntityKind, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const REQUIRED_TABLES: &[&str] = &[
    "recipes",
    "recipe_images",
    "instruction_sections",
    "instructions",
    "recipe_ingredients",
    "tags",
    "recipe_tags",
];

const RECIPE_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    description,
    servings,
    prep_minutes,
    cook_minutes,
    times_made,
    date_accessed,
    created_at,
    updated_at
FROM recipes";

/// Ordering for recipe lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecipeSort {
    #[default]
    Name,
    /// Most recently opened first; never-opened recipes last.
    RecentlyAccessed,
    /// Highest `times_made` first.
    MostMade,
}

/// Query options for listing recipes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeListQuery {
    /// Optional single-tag exact match filter (case-insensitive).
    pub tag: Option<String>,
    pub sort: RecipeSort,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for recipe aggregate operations.
pub trait RecipeRepository {
    fn create_recipe(&self, recipe: &Recipe) -> RepoResult<RecipeId>;
    /// Updates descriptive fields; counters are left untouched.
    fn update_recipe(&self, recipe: &Recipe) -> RepoResult<()>;
    fn get_recipe(&self, id: RecipeId) -> RepoResult<Option<Recipe>>;
    fn list_recipes(&self, query: &RecipeListQuery) -> RepoResult<Vec<Recipe>>;
    fn delete_recipe(&self, id: RecipeId) -> RepoResult<()>;
    /// Sets `date_accessed` to the current time.
    fn touch_recipe(&self, id: RecipeId) -> RepoResult<()>;
    /// Increments `times_made` and returns the new value.
    fn mark_made(&self, id: RecipeId) -> RepoResult<u32>;
    fn add_image(&self, image: &RecipeImage) -> RepoResult<Uuid>;
    fn list_images(&self, recipe_id: RecipeId) -> RepoResult<Vec<RecipeImage>>;
    fn delete_image(&self, id: Uuid) -> RepoResult<()>;
    fn replace_instructions(&self, recipe_id: RecipeId, sections: &[SectionDraft])
        -> RepoResult<()>;
    fn list_instructions(&self, recipe_id: RecipeId) -> RepoResult<Vec<InstructionSection>>;
    fn replace_ingredients(
        &self,
        recipe_id: RecipeId,
        lines: &[RecipeIngredientDraft],
    ) -> RepoResult<()>;
    fn list_ingredients(&self, recipe_id: RecipeId) -> RepoResult<Vec<RecipeIngredient>>;
    /// Lists recipes with at least one line using `ingredient_id`.
    fn list_recipes_using(&self, ingredient_id: IngredientId) -> RepoResult<Vec<Recipe>>;
    /// Replaces all tags of one recipe; tags are normalized and deduplicated.
    fn set_tags(&self, recipe_id: RecipeId, tags: &[String]) -> RepoResult<Vec<String>>;
    fn list_recipe_tags(&self, recipe_id: RecipeId) -> RepoResult<Vec<String>>;
    fn list_tags(&self) -> RepoResult<Vec<String>>;
}

/// SQLite-backed recipe repository.
#[derive(Clone, Copy)]
pub struct SqliteRecipeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecipeRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl RecipeRepository for SqliteRecipeRepository<'_> {
    fn create_recipe(&self, recipe: &Recipe) -> RepoResult<RecipeId> {
        recipe.validate()?;
        self.conn.execute(
            "INSERT INTO recipes (
                uuid,
                name,
                description,
                servings,
                prep_minutes,
                cook_minutes,
                times_made,
                date_accessed
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                recipe.id.to_string(),
                recipe.name.as_str(),
                recipe.description.as_deref(),
                recipe.servings,
                recipe.prep_minutes,
                recipe.cook_minutes,
                recipe.times_made,
                recipe.date_accessed,
            ],
        )?;
        Ok(recipe.id)
    }

    fn update_recipe(&self, recipe: &Recipe) -> RepoResult<()> {
        recipe.validate()?;
        let changed = self.conn.execute(
            "UPDATE recipes
             SET
                name = ?2,
                description = ?3,
                servings = ?4,
                prep_minutes = ?5,
                cook_minutes = ?6,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![
                recipe.id.to_string(),
                recipe.name.as_str(),
                recipe.description.as_deref(),
                recipe.servings,
                recipe.prep_minutes,
                recipe.cook_minutes,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Recipe, recipe.id));
        }
        Ok(())
    }

    fn get_recipe(&self, id: RecipeId) -> RepoResult<Option<Recipe>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{RECIPE_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_recipe_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_recipes(&self, query: &RecipeListQuery) -> RepoResult<Vec<Recipe>> {
        let mut sql = format!("{RECIPE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(tag) = query.tag.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM recipe_tags rt
                    INNER JOIN tags t ON t.id = rt.tag_id
                    WHERE rt.recipe_uuid = recipes.uuid
                      AND t.name = ? COLLATE NOCASE
                )",
            );
            bind_values.push(Value::Text(tag.to_string()));
        }

        match query.sort {
            RecipeSort::Name => sql.push_str(" ORDER BY name COLLATE NOCASE ASC, uuid ASC"),
            RecipeSort::RecentlyAccessed => sql.push_str(
                " ORDER BY date_accessed IS NULL, date_accessed DESC, name COLLATE NOCASE ASC",
            ),
            RecipeSort::MostMade => sql.push_str(
                " ORDER BY times_made DESC, name COLLATE NOCASE ASC, uuid ASC",
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
        let mut recipes = Vec::new();
        while let Some(row) = rows.next()? {
            recipes.push(parse_recipe_row(row)?);
        }
        Ok(recipes)
    }

    fn delete_recipe(&self, id: RecipeId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM recipes WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Recipe, id));
        }
        Ok(())
    }

    fn touch_recipe(&self, id: RecipeId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE recipes SET date_accessed = ?2 WHERE uuid = ?1;",
            params![id.to_string(), now_epoch_ms()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Recipe, id));
        }
        Ok(())
    }

    fn mark_made(&self, id: RecipeId) -> RepoResult<u32> {
        let tx = begin_immediate(self.conn)?;
        let changed = tx.execute(
            "UPDATE recipes SET times_made = times_made + 1 WHERE uuid = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Recipe, id));
        }
        let times_made: i64 = tx.query_row(
            "SELECT times_made FROM recipes WHERE uuid = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )?;
        tx.commit()?;
        u32::try_from(times_made).map_err(|_| {
            RepoError::InvalidData(format!("invalid value `{times_made}` in recipes.times_made"))
        })
    }

    fn add_image(&self, image: &RecipeImage) -> RepoResult<Uuid> {
        image.validate()?;
        if !recipe_exists(self.conn, image.recipe_id)? {
            return Err(RepoError::not_found(EntityKind::Recipe, image.recipe_id));
        }
        self.conn.execute(
            "INSERT INTO recipe_images (uuid, recipe_uuid, uri) VALUES (?1, ?2, ?3);",
            params![
                image.id.to_string(),
                image.recipe_id.to_string(),
                image.uri.as_str()
            ],
        )?;
        Ok(image.id)
    }

    fn list_images(&self, recipe_id: RecipeId) -> RepoResult<Vec<RecipeImage>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, recipe_uuid, uri
             FROM recipe_images
             WHERE recipe_uuid = ?1
             ORDER BY created_at ASC, rowid ASC;",
        )?;
        let mut rows = stmt.query([recipe_id.to_string()])?;
        let mut images = Vec::new();
        while let Some(row) = rows.next()? {
            let image = RecipeImage {
                id: uuid_column(row, "uuid")?,
                recipe_id: uuid_column(row, "recipe_uuid")?,
                uri: row.get("uri")?,
            };
            image.validate()?;
            images.push(image);
        }
        Ok(images)
    }

    fn delete_image(&self, id: Uuid) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM recipe_images WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::RecipeImage, id));
        }
        Ok(())
    }

    fn replace_instructions(
        &self,
        recipe_id: RecipeId,
        sections: &[SectionDraft],
    ) -> RepoResult<()> {
        for section in sections {
            section.validate()?;
        }

        let recipe_uuid = recipe_id.to_string();
        let tx = begin_immediate(self.conn)?;
        if !recipe_exists(&tx, recipe_id)? {
            return Err(RepoError::not_found(EntityKind::Recipe, recipe_id));
        }

        tx.execute(
            "DELETE FROM instruction_sections WHERE recipe_uuid = ?1;",
            [recipe_uuid.as_str()],
        )?;

        for (section_pos, section) in sections.iter().enumerate() {
            let section_uuid = Uuid::new_v4().to_string();
            let name = section
                .name
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty());
            tx.execute(
                "INSERT INTO instruction_sections (uuid, recipe_uuid, name, position)
                 VALUES (?1, ?2, ?3, ?4);",
                params![section_uuid.as_str(), recipe_uuid.as_str(), name, section_pos],
            )?;
            for (step_pos, step) in section.steps.iter().enumerate() {
                tx.execute(
                    "INSERT INTO instructions (uuid, section_uuid, text, position)
                     VALUES (?1, ?2, ?3, ?4);",
                    params![
                        Uuid::new_v4().to_string(),
                        section_uuid.as_str(),
                        step.trim(),
                        step_pos
                    ],
                )?;
            }
        }

        touch_updated_at(&tx, &recipe_uuid)?;
        tx.commit()?;
        Ok(())
    }

    fn list_instructions(&self, recipe_id: RecipeId) -> RepoResult<Vec<InstructionSection>> {
        let mut section_stmt = self.conn.prepare(
            "SELECT uuid, recipe_uuid, name, position
             FROM instruction_sections
             WHERE recipe_uuid = ?1
             ORDER BY position ASC;",
        )?;
        let mut step_stmt = self.conn.prepare(
            "SELECT uuid, section_uuid, text, position
             FROM instructions
             WHERE section_uuid = ?1
             ORDER BY position ASC;",
        )?;

        let mut rows = section_stmt.query([recipe_id.to_string()])?;
        let mut sections = Vec::new();
        while let Some(row) = rows.next()? {
            let id = uuid_column(row, "uuid")?;
            let mut step_rows = step_stmt.query([id.to_string()])?;
            let mut steps = Vec::new();
            while let Some(step_row) = step_rows.next()? {
                steps.push(Instruction {
                    id: uuid_column(step_row, "uuid")?,
                    section_id: uuid_column(step_row, "section_uuid")?,
                    text: step_row.get("text")?,
                    position: u32_column(step_row, "position")?,
                });
            }
            sections.push(InstructionSection {
                id,
                recipe_id: uuid_column(row, "recipe_uuid")?,
                name: row.get("name")?,
                position: u32_column(row, "position")?,
                steps,
            });
        }
        Ok(sections)
    }

    fn replace_ingredients(
        &self,
        recipe_id: RecipeId,
        lines: &[RecipeIngredientDraft],
    ) -> RepoResult<()> {
        for line in lines {
            line.validate()?;
        }

        let recipe_uuid = recipe_id.to_string();
        let tx = begin_immediate(self.conn)?;
        if !recipe_exists(&tx, recipe_id)? {
            return Err(RepoError::not_found(EntityKind::Recipe, recipe_id));
        }

        tx.execute(
            "DELETE FROM recipe_ingredients WHERE recipe_uuid = ?1;",
            [recipe_uuid.as_str()],
        )?;

        for (position, line) in lines.iter().enumerate() {
            let exists: i64 = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM ingredients WHERE uuid = ?1);",
                [line.ingredient_id.to_string()],
                |row| row.get(0),
            )?;
            if exists != 1 {
                return Err(RepoError::not_found(
                    EntityKind::Ingredient,
                    line.ingredient_id,
                ));
            }

            tx.execute(
                "INSERT INTO recipe_ingredients (
                    uuid,
                    recipe_uuid,
                    ingredient_uuid,
                    variant_uuid,
                    quantity,
                    measure_uuid,
                    note,
                    position
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
                params![
                    Uuid::new_v4().to_string(),
                    recipe_uuid.as_str(),
                    line.ingredient_id.to_string(),
                    uuid_text(line.variant_id),
                    line.quantity,
                    uuid_text(line.measure_id),
                    line.note.as_deref().map(str::trim).filter(|n| !n.is_empty()),
                    position,
                ],
            )?;
        }

        touch_updated_at(&tx, &recipe_uuid)?;
        tx.commit()?;
        Ok(())
    }

    fn list_ingredients(&self, recipe_id: RecipeId) -> RepoResult<Vec<RecipeIngredient>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                uuid,
                recipe_uuid,
                ingredient_uuid,
                variant_uuid,
                quantity,
                measure_uuid,
                note,
                position
             FROM recipe_ingredients
             WHERE recipe_uuid = ?1
             ORDER BY position ASC;",
        )?;
        let mut rows = stmt.query([recipe_id.to_string()])?;
        let mut lines = Vec::new();
        while let Some(row) = rows.next()? {
            let quantity: f64 = row.get("quantity")?;
            if !quantity.is_finite() || quantity <= 0.0 {
                return Err(RepoError::InvalidData(format!(
                    "invalid quantity `{quantity}` in recipe_ingredients.quantity"
                )));
            }
            lines.push(RecipeIngredient {
                id: uuid_column(row, "uuid")?,
                recipe_id: uuid_column(row, "recipe_uuid")?,
                ingredient_id: uuid_column(row, "ingredient_uuid")?,
                variant_id: optional_uuid_column(row, "variant_uuid")?,
                quantity,
                measure_id: optional_uuid_column(row, "measure_uuid")?,
                note: row.get("note")?,
                position: u32_column(row, "position")?,
            });
        }
        Ok(lines)
    }

    fn list_recipes_using(&self, ingredient_id: IngredientId) -> RepoResult<Vec<Recipe>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RECIPE_SELECT_SQL}
             WHERE uuid IN (
                SELECT recipe_uuid FROM recipe_ingredients WHERE ingredient_uuid = ?1
             )
             ORDER BY name COLLATE NOCASE ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([ingredient_id.to_string()])?;
        let mut recipes = Vec::new();
        while let Some(row) = rows.next()? {
            recipes.push(parse_recipe_row(row)?);
        }
        Ok(recipes)
    }

    fn set_tags(&self, recipe_id: RecipeId, tags: &[String]) -> RepoResult<Vec<String>> {
        let normalized = normalize_tags(tags)?;
        let recipe_uuid = recipe_id.to_string();
        let tx = begin_immediate(self.conn)?;
        if !recipe_exists(&tx, recipe_id)? {
            return Err(RepoError::not_found(EntityKind::Recipe, recipe_id));
        }
        replace_tags(&tx, TagOwner::Recipe, &recipe_uuid, &normalized)?;
        touch_updated_at(&tx, &recipe_uuid)?;
        tx.commit()?;
        Ok(normalized)
    }

    fn list_recipe_tags(&self, recipe_id: RecipeId) -> RepoResult<Vec<String>> {
        load_tags(self.conn, TagOwner::Recipe, &recipe_id.to_string())
    }

    fn list_tags(&self) -> RepoResult<Vec<String>> {
        list_all_tags(self.conn)
    }
}

fn recipe_exists(conn: &Connection, id: RecipeId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM recipes WHERE uuid = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn touch_updated_at(conn: &Connection, recipe_uuid: &str) -> RepoResult<()> {
    conn.execute(
        "UPDATE recipes SET updated_at = (strftime('%s', 'now') * 1000) WHERE uuid = ?1;",
        [recipe_uuid],
    )?;
    Ok(())
}

fn parse_recipe_row(row: &Row<'_>) -> RepoResult<Recipe> {
    let recipe = Recipe {
        id: uuid_column(row, "uuid")?,
        name: row.get("name")?,
        description: row.get("description")?,
        servings: optional_u32_column(row, "servings")?,
        prep_minutes: optional_u32_column(row, "prep_minutes")?,
        cook_minutes: optional_u32_column(row, "cook_minutes")?,
        times_made: u32_column(row, "times_made")?,
        date_accessed: row.get("date_accessed")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    recipe.validate()?;
    Ok(recipe)
}
