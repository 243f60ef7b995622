//! Meal log use-case service.
//!
//! # Invariants
//! - Logging a meal from a recipe copies the recipe's ingredient lines and
//!   increments the recipe's `times_made` exactly once.

use crate::model::meal::{MealEntry, MealEntryId, MealEntryIngredient};
use crate::model::recipe::RecipeId;
use crate::repo::ingredient_repo::IngredientRepository;
use crate::repo::meal_repo::MealRepository;
use crate::repo::recipe_repo::RecipeRepository;
use crate::repo::EntityKind;
use crate::service::{not_found, ServiceError, ServiceResult};
use log::info;

/// Meal entry ingredient with its display name.
#[derive(Debug, Clone, PartialEq)]
pub struct MealIngredientLine {
    pub ingredient: MealEntryIngredient,
    pub ingredient_name: String,
}

/// Entry with tags and ingredients for the detail screen.
#[derive(Debug, Clone, PartialEq)]
pub struct MealEntryDetail {
    pub entry: MealEntry,
    pub tags: Vec<String>,
    pub ingredients: Vec<MealIngredientLine>,
}

/// Meal log facade.
pub struct MealService<E: MealRepository, R: RecipeRepository, I: IngredientRepository> {
    meals: E,
    recipes: R,
    ingredients: I,
}

impl<E, R, I> MealService<E, R, I>
where
    E: MealRepository,
    R: RecipeRepository,
    I: IngredientRepository,
{
    pub fn new(meals: E, recipes: R, ingredients: I) -> Self {
        Self {
            meals,
            recipes,
            ingredients,
        }
    }

    /// Stores an entry with its tags and ingredients.
    pub fn log_meal(
        &self,
        entry: &MealEntry,
        tags: &[String],
        ingredients: &[MealEntryIngredient],
    ) -> ServiceResult<MealEntryDetail> {
        let id = self.meals.create_entry(entry)?;
        self.meals.set_entry_tags(id, tags)?;
        self.meals.set_entry_ingredients(id, ingredients)?;
        info!("event=meal_log module=service status=ok meal_entry_id={id}");
        self.entry_detail(id)
    }

    /// Logs a meal cooked from a recipe.
    ///
    /// The entry is named after the recipe, carries its ingredient lines and
    /// the recipe's `times_made` counter is incremented.
    pub fn log_recipe_meal(
        &self,
        recipe_id: RecipeId,
        eaten_at: i64,
        note: Option<String>,
    ) -> ServiceResult<MealEntryDetail> {
        let recipe = self
            .recipes
            .get_recipe(recipe_id)?
            .ok_or_else(|| not_found(EntityKind::Recipe, recipe_id))?;
        let ingredients = self
            .recipes
            .list_ingredients(recipe_id)?
            .into_iter()
            .map(|line| MealEntryIngredient {
                ingredient_id: line.ingredient_id,
                quantity: Some(line.quantity),
                measure_id: line.measure_id,
            })
            .collect::<Vec<_>>();

        let mut entry = MealEntry::new(recipe.name, eaten_at);
        entry.note = note
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        entry.recipe_id = Some(recipe_id);

        let id = self.meals.create_entry(&entry)?;
        self.meals.set_entry_ingredients(id, &ingredients)?;
        let times_made = self.recipes.mark_made(recipe_id)?;
        info!(
            "event=meal_log module=service status=ok meal_entry_id={id} recipe_id={recipe_id} times_made={times_made}"
        );
        self.entry_detail(id)
    }

    pub fn update_entry(&self, entry: &MealEntry) -> ServiceResult<MealEntryDetail> {
        self.meals.update_entry(entry)?;
        self.entry_detail(entry.id)
    }

    pub fn set_entry_tags(&self, id: MealEntryId, tags: &[String]) -> ServiceResult<Vec<String>> {
        Ok(self.meals.set_entry_tags(id, tags)?)
    }

    pub fn delete_entry(&self, id: MealEntryId) -> ServiceResult<()> {
        Ok(self.meals.delete_entry(id)?)
    }

    /// Entries with `from <= eaten_at < to`, oldest first.
    pub fn list_between(&self, from: i64, to: i64) -> ServiceResult<Vec<MealEntry>> {
        if to < from {
            return Err(ServiceError::InvalidInput(format!(
                "range end {to} is before start {from}"
            )));
        }
        Ok(self.meals.list_entries_between(from, to)?)
    }

    pub fn entry_detail(&self, id: MealEntryId) -> ServiceResult<MealEntryDetail> {
        let entry = self
            .meals
            .get_entry(id)?
            .ok_or_else(|| not_found(EntityKind::MealEntry, id))?;

        let mut ingredients = Vec::new();
        for ingredient in self.meals.list_entry_ingredients(id)? {
            let name = self
                .ingredients
                .get_ingredient(ingredient.ingredient_id)?
                .map(|record| record.name)
                .ok_or(ServiceError::InconsistentState(
                    "meal entry references a missing ingredient",
                ))?;
            ingredients.push(MealIngredientLine {
                ingredient,
                ingredient_name: name,
            });
        }

        Ok(MealEntryDetail {
            tags: self.meals.list_entry_tags(id)?,
            ingredients,
            entry,
        })
    }
}
