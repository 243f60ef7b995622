//! Ingredient catalog records.
//!
//! # Invariants
//! - Ingredient names are unique case-insensitively (enforced by storage).
//! - Variants and images belong to exactly one ingredient and disappear with it.

use crate::model::{require_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type IngredientId = Uuid;
pub type VariantId = Uuid;

/// Catalog entry for a raw ingredient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    pub description: Option<String>,
    /// Epoch milliseconds of the last detail view, if any.
    pub date_accessed: Option<i64>,
}

impl Ingredient {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    pub fn with_id(id: IngredientId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into().trim().to_string(),
            description: None,
            date_accessed: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("ingredient.name", &self.name)
    }
}

/// Named variety of an ingredient, e.g. "red" for onion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientVariant {
    pub id: VariantId,
    pub ingredient_id: IngredientId,
    pub name: String,
}

impl IngredientVariant {
    pub fn new(ingredient_id: IngredientId, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            ingredient_id,
            name: name.into().trim().to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("ingredient_variant.name", &self.name)
    }
}

/// Image reference attached to an ingredient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientImage {
    pub id: Uuid,
    pub ingredient_id: IngredientId,
    pub uri: String,
}

impl IngredientImage {
    pub fn new(ingredient_id: IngredientId, uri: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            ingredient_id,
            uri: uri.into().trim().to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("ingredient_image.uri", &self.uri)
    }
}
