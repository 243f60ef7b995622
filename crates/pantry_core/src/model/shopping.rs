//! Shopping lists and their items.

use crate::model::ingredient::IngredientId;
use crate::model::{require_positive, require_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ShoppingListId = Uuid;
pub type ShoppingItemId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingList {
    pub id: ShoppingListId,
    pub name: String,
}

impl ShoppingList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into().trim().to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("shopping_list.name", &self.name)
    }
}

/// One line on a shopping list.
///
/// `unit` is free text so parsed input ("2 tbsp") survives even when no
/// matching measure exists in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingListItem {
    pub id: ShoppingItemId,
    pub list_id: ShoppingListId,
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub ingredient_id: Option<IngredientId>,
    pub checked: bool,
    pub position: u32,
}

impl ShoppingListItem {
    /// Creates an unchecked item; the repository assigns the final position.
    pub fn new(list_id: ShoppingListId, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            list_id,
            name: name.into().trim().to_string(),
            quantity: None,
            unit: None,
            ingredient_id: None,
            checked: false,
            position: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("shopping_list_item.name", &self.name)?;
        if let Some(quantity) = self.quantity {
            require_positive("shopping_list_item.quantity", quantity)?;
        }
        if let Some(unit) = self.unit.as_deref() {
            require_text("shopping_list_item.unit", unit)?;
        }
        Ok(())
    }
}
