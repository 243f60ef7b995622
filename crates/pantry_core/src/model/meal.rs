//! Meal log entries.

use crate::model::ingredient::IngredientId;
use crate::model::measure::MeasureId;
use crate::model::recipe::RecipeId;
use crate::model::{require_positive, require_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type MealEntryId = Uuid;

/// Something the user ate (or plans to eat) at `eaten_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealEntry {
    pub id: MealEntryId,
    pub name: String,
    /// Epoch milliseconds.
    pub eaten_at: i64,
    pub note: Option<String>,
    pub recipe_id: Option<RecipeId>,
}

impl MealEntry {
    pub fn new(name: impl Into<String>, eaten_at: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into().trim().to_string(),
            eaten_at,
            note: None,
            recipe_id: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("meal_entry.name", &self.name)
    }
}

/// Ingredient cross-reference of a meal entry. Quantity is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealEntryIngredient {
    pub ingredient_id: IngredientId,
    pub quantity: Option<f64>,
    pub measure_id: Option<MeasureId>,
}

impl MealEntryIngredient {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.quantity {
            Some(value) => require_positive("meal_entry_ingredient.quantity", value),
            None => Ok(()),
        }
    }
}
