//! Shopping list use-case service.
//!
//! # Responsibility
//! - Add items typed as free text through the quantity parser.
//! - Copy a recipe's ingredient lines onto a list.
//!
//! # Invariants
//! - Strict mode rejects text the parser cannot read; lenient mode stores it
//!   as a name-only item.
//! - Recipe lines with the same ingredient and measure are merged into one
//!   unchecked item by summing quantities.

use crate::model::ingredient::IngredientId;
use crate::model::measure::MeasureId;
use crate::model::recipe::RecipeId;
use crate::model::shopping::{ShoppingItemId, ShoppingList, ShoppingListId, ShoppingListItem};
use crate::parse::quantity::{parse_quantity, QuantityParseError};
use crate::repo::ingredient_repo::IngredientRepository;
use crate::repo::measure_repo::MeasureRepository;
use crate::repo::recipe_repo::RecipeRepository;
use crate::repo::shopping_repo::{ShoppingListSummary, ShoppingRepository};
use crate::repo::EntityKind;
use crate::service::{not_found, ServiceError, ServiceResult};
use log::{info, warn};

/// How free text that the parser rejects is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    /// Unparseable text is an error.
    #[default]
    Strict,
    /// Unparseable text becomes a name-only item.
    Lenient,
}

/// List header with its ordered items.
#[derive(Debug, Clone, PartialEq)]
pub struct ShoppingListDetail {
    pub list: ShoppingList,
    pub items: Vec<ShoppingListItem>,
}

/// Outcome of copying a recipe onto a list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeMergeReport {
    pub added: u32,
    pub merged: u32,
}

/// Shopping facade over list, recipe, ingredient and measure repositories.
pub struct ShoppingService<S, R, I, M>
where
    S: ShoppingRepository,
    R: RecipeRepository,
    I: IngredientRepository,
    M: MeasureRepository,
{
    lists: S,
    recipes: R,
    ingredients: I,
    measures: M,
}

impl<S, R, I, M> ShoppingService<S, R, I, M>
where
    S: ShoppingRepository,
    R: RecipeRepository,
    I: IngredientRepository,
    M: MeasureRepository,
{
    pub fn new(lists: S, recipes: R, ingredients: I, measures: M) -> Self {
        Self {
            lists,
            recipes,
            ingredients,
            measures,
        }
    }

    pub fn create_list(&self, name: &str) -> ServiceResult<ShoppingList> {
        let list = ShoppingList::new(name);
        let id = self.lists.create_list(&list)?;
        info!("event=shopping_list_create module=service status=ok list_id={id}");
        self.lists
            .get_list(id)?
            .ok_or(ServiceError::InconsistentState(
                "created list not found in read-back",
            ))
    }

    pub fn rename_list(&self, id: ShoppingListId, name: &str) -> ServiceResult<()> {
        Ok(self.lists.rename_list(id, name)?)
    }

    pub fn delete_list(&self, id: ShoppingListId) -> ServiceResult<()> {
        self.lists.delete_list(id)?;
        info!("event=shopping_list_delete module=service status=ok list_id={id}");
        Ok(())
    }

    pub fn list_lists(&self) -> ServiceResult<Vec<ShoppingListSummary>> {
        Ok(self.lists.list_lists()?)
    }

    pub fn list_detail(&self, id: ShoppingListId) -> ServiceResult<ShoppingListDetail> {
        let list = self
            .lists
            .get_list(id)?
            .ok_or_else(|| not_found(EntityKind::ShoppingList, id))?;
        Ok(ShoppingListDetail {
            items: self.lists.list_items(id)?,
            list,
        })
    }

    /// Parses `text` and appends the resulting item.
    ///
    /// Known units are stored by their catalog abbreviation, and the name is
    /// linked to a catalog ingredient when one matches exactly.
    pub fn add_item_from_text(
        &self,
        list_id: ShoppingListId,
        text: &str,
        mode: ParseMode,
    ) -> ServiceResult<ShoppingListItem> {
        let mut item = match parse_quantity(text) {
            Ok(parsed) => {
                let unit = match self.measures.find_measure_by_label(&parsed.unit)? {
                    Some(measure) => measure.abbreviation,
                    None => parsed.unit,
                };
                let mut item = ShoppingListItem::new(list_id, parsed.name);
                item.quantity = Some(parsed.quantity);
                item.unit = Some(unit);
                item
            }
            Err(QuantityParseError::Empty) => return Err(QuantityParseError::Empty.into()),
            Err(err) if mode == ParseMode::Lenient => {
                warn!("event=shopping_item_parse module=service status=fallback error={err}");
                ShoppingListItem::new(list_id, text.split_whitespace().collect::<Vec<_>>().join(" "))
            }
            Err(err) => return Err(err.into()),
        };

        item.ingredient_id = self
            .ingredients
            .find_ingredient_by_name(&item.name)?
            .map(|ingredient| ingredient.id);
        Ok(self.lists.add_item(&item)?)
    }

    pub fn set_item_checked(&self, id: ShoppingItemId, checked: bool) -> ServiceResult<()> {
        Ok(self.lists.set_item_checked(id, checked)?)
    }

    pub fn delete_item(&self, id: ShoppingItemId) -> ServiceResult<()> {
        Ok(self.lists.delete_item(id)?)
    }

    pub fn clear_checked(&self, list_id: ShoppingListId) -> ServiceResult<u32> {
        let removed = self.lists.clear_checked(list_id)?;
        info!("event=shopping_clear_checked module=service status=ok list_id={list_id} removed={removed}");
        Ok(removed)
    }

    /// Copies every ingredient line of a recipe onto a list.
    ///
    /// Lines sharing ingredient and measure are summed, then folded into an
    /// existing unchecked item for the same ingredient and unit if present.
    pub fn add_recipe_to_list(
        &self,
        list_id: ShoppingListId,
        recipe_id: RecipeId,
    ) -> ServiceResult<RecipeMergeReport> {
        if self.recipes.get_recipe(recipe_id)?.is_none() {
            return Err(not_found(EntityKind::Recipe, recipe_id));
        }
        if self.lists.get_list(list_id)?.is_none() {
            return Err(not_found(EntityKind::ShoppingList, list_id));
        }

        let mut merged_lines: Vec<(IngredientId, Option<MeasureId>, f64)> = Vec::new();
        for line in self.recipes.list_ingredients(recipe_id)? {
            let same = merged_lines.iter().position(|(ingredient, measure, _)| {
                *ingredient == line.ingredient_id && *measure == line.measure_id
            });
            match same {
                Some(index) => merged_lines[index].2 += line.quantity,
                None => merged_lines.push((line.ingredient_id, line.measure_id, line.quantity)),
            }
        }

        let mut existing = self.lists.list_items(list_id)?;
        let mut report = RecipeMergeReport::default();
        for (ingredient_id, measure_id, quantity) in merged_lines {
            let ingredient = self
                .ingredients
                .get_ingredient(ingredient_id)?
                .ok_or_else(|| not_found(EntityKind::Ingredient, ingredient_id))?;
            let unit = match measure_id {
                Some(measure_id) => Some(
                    self.measures
                        .get_measure(measure_id)?
                        .ok_or_else(|| not_found(EntityKind::Measure, measure_id))?
                        .abbreviation,
                ),
                None => None,
            };

            let target = existing.iter().position(|item| {
                !item.checked
                    && item.ingredient_id == Some(ingredient_id)
                    && unit_matches(item.unit.as_deref(), unit.as_deref())
            });
            match target {
                Some(index) => {
                    let item = &mut existing[index];
                    item.quantity = Some(item.quantity.unwrap_or(0.0) + quantity);
                    self.lists.update_item(item)?;
                    report.merged += 1;
                }
                None => {
                    let mut item = ShoppingListItem::new(list_id, ingredient.name);
                    item.quantity = Some(quantity);
                    item.unit = unit;
                    item.ingredient_id = Some(ingredient_id);
                    existing.push(self.lists.add_item(&item)?);
                    report.added += 1;
                }
            }
        }

        info!(
            "event=shopping_add_recipe module=service status=ok list_id={list_id} recipe_id={recipe_id} added={} merged={}",
            report.added, report.merged
        );
        Ok(report)
    }
}

fn unit_matches(left: Option<&str>, right: Option<&str>) -> bool {
    match (left, right) {
        (None, None) => true,
        (Some(left), Some(right)) => left.eq_ignore_ascii_case(right),
        _ => false,
    }
}
