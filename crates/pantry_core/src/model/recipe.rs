//! Recipe aggregate records.
//!
//! # Responsibility
//! - Define the recipe row plus its owned children (images, instruction
//!   sections/steps, ingredient lines).
//! - Define draft shapes used by replace-all write paths.
//!
//! # Invariants
//! - `servings`, when set, is at least 1.
//! - Ingredient line quantities are finite and strictly positive.
//! - Positions are dense and zero-based within their parent.

use crate::model::ingredient::{IngredientId, VariantId};
use crate::model::measure::MeasureId;
use crate::model::{require_positive, require_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type RecipeId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    pub description: Option<String>,
    pub servings: Option<u32>,
    pub prep_minutes: Option<u32>,
    pub cook_minutes: Option<u32>,
    /// Incremented each time the user marks the recipe as cooked.
    pub times_made: u32,
    /// Epoch milliseconds of the last detail view, if any.
    pub date_accessed: Option<i64>,
    /// Epoch milliseconds assigned by storage; `None` until read back.
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

impl Recipe {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    pub fn with_id(id: RecipeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into().trim().to_string(),
            description: None,
            servings: None,
            prep_minutes: None,
            cook_minutes: None,
            times_made: 0,
            date_accessed: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("recipe.name", &self.name)?;
        if self.servings == Some(0) {
            return Err(ValidationError::OutOfRange {
                field: "recipe.servings",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Prep plus cook time, treating a missing part as zero. `None` when
    /// neither is known; saturates at `u32::MAX`.
    pub fn total_minutes(&self) -> Option<u32> {
        match (self.prep_minutes, self.cook_minutes) {
            (None, None) => None,
            (prep, cook) => Some(prep.unwrap_or(0).saturating_add(cook.unwrap_or(0))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeImage {
    pub id: Uuid,
    pub recipe_id: RecipeId,
    pub uri: String,
}

impl RecipeImage {
    pub fn new(recipe_id: RecipeId, uri: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipe_id,
            uri: uri.into().trim().to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("recipe_image.uri", &self.uri)
    }
}

/// One step of a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub id: Uuid,
    pub section_id: Uuid,
    pub text: String,
    pub position: u32,
}

/// Ordered group of steps ("For the sauce", ...). `name` is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionSection {
    pub id: Uuid,
    pub recipe_id: RecipeId,
    pub name: Option<String>,
    pub position: u32,
    pub steps: Vec<Instruction>,
}

/// Input shape for replacing all instruction sections of a recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionDraft {
    pub name: Option<String>,
    pub steps: Vec<String>,
}

impl SectionDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for step in &self.steps {
            require_text("instruction.text", step)?;
        }
        Ok(())
    }
}

/// Quantity of one ingredient used by a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub id: Uuid,
    pub recipe_id: RecipeId,
    pub ingredient_id: IngredientId,
    pub variant_id: Option<VariantId>,
    pub quantity: f64,
    pub measure_id: Option<MeasureId>,
    pub note: Option<String>,
    pub position: u32,
}

/// Input shape for replacing all ingredient lines of a recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeIngredientDraft {
    pub ingredient_id: IngredientId,
    pub variant_id: Option<VariantId>,
    pub quantity: f64,
    pub measure_id: Option<MeasureId>,
    pub note: Option<String>,
}

impl RecipeIngredientDraft {
    pub fn new(ingredient_id: IngredientId, quantity: f64, measure_id: Option<MeasureId>) -> Self {
        Self {
            ingredient_id,
            variant_id: None,
            quantity,
            measure_id,
            note: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_positive("recipe_ingredient.quantity", self.quantity)
    }
}
