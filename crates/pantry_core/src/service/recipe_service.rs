//! Recipe use-case service.
//!
//! # Responsibility
//! - Assemble recipe detail aggregates with resolved ingredient names and measures.
//! - Scale ingredient lines to a serving count.
//! - Produce a cooking view with lines converted to a preferred measure.
//!
//! # Invariants
//! - `open_recipe` stamps `date_accessed`; `recipe_detail` does not.
//! - Scaling and conversion never write to storage.

use crate::conversion::{convert, ConversionError};
use crate::model::ingredient::IngredientVariant;
use crate::model::measure::{Measure, MeasureId};
use crate::model::recipe::{
    InstructionSection, Recipe, RecipeId, RecipeImage, RecipeIngredient, RecipeIngredientDraft,
    SectionDraft,
};
use crate::repo::ingredient_repo::IngredientRepository;
use crate::repo::measure_repo::MeasureRepository;
use crate::repo::recipe_repo::{RecipeListQuery, RecipeRepository};
use crate::repo::{normalize_limit, EntityKind};
use crate::service::{not_found, ServiceError, ServiceResult};
use log::info;
use std::collections::HashMap;

const DEFAULT_LIST_LIMIT: u32 = 50;
const MAX_LIST_LIMIT: u32 = 200;

/// Recipe ingredient line with display names resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct IngredientLine {
    pub line: RecipeIngredient,
    pub ingredient_name: String,
    pub variant_name: Option<String>,
    pub measure: Option<Measure>,
}

/// Everything a recipe detail screen renders.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDetail {
    pub recipe: Recipe,
    pub images: Vec<RecipeImage>,
    pub sections: Vec<InstructionSection>,
    pub ingredients: Vec<IngredientLine>,
    pub tags: Vec<String>,
}

/// One line of the cooking view.
#[derive(Debug, Clone, PartialEq)]
pub struct CookingLine {
    pub ingredient: IngredientLine,
    /// Quantity to display, already scaled and converted when possible.
    pub quantity: f64,
    pub measure: Option<Measure>,
    /// Whether `quantity` was converted into the requested measure.
    pub converted: bool,
}

/// Recipe facade over recipe, ingredient and measure repositories.
pub struct RecipeService<R: RecipeRepository, I: IngredientRepository, M: MeasureRepository> {
    recipes: R,
    ingredients: I,
    measures: M,
}

impl<R, I, M> RecipeService<R, I, M>
where
    R: RecipeRepository,
    I: IngredientRepository,
    M: MeasureRepository,
{
    pub fn new(recipes: R, ingredients: I, measures: M) -> Self {
        Self {
            recipes,
            ingredients,
            measures,
        }
    }

    /// Creates one recipe and returns the stored record.
    pub fn create_recipe(&self, recipe: &Recipe) -> ServiceResult<Recipe> {
        let id = self.recipes.create_recipe(recipe)?;
        info!("event=recipe_create module=service status=ok recipe_id={id}");
        self.recipes
            .get_recipe(id)?
            .ok_or(ServiceError::InconsistentState(
                "created recipe not found in read-back",
            ))
    }

    /// Updates descriptive fields; counters and access time are kept.
    pub fn update_recipe(&self, recipe: &Recipe) -> ServiceResult<Recipe> {
        self.recipes.update_recipe(recipe)?;
        self.recipes
            .get_recipe(recipe.id)?
            .ok_or(ServiceError::InconsistentState(
                "updated recipe not found in read-back",
            ))
    }

    pub fn delete_recipe(&self, id: RecipeId) -> ServiceResult<()> {
        self.recipes.delete_recipe(id)?;
        info!("event=recipe_delete module=service status=ok recipe_id={id}");
        Ok(())
    }

    pub fn list_recipes(&self, query: &RecipeListQuery) -> ServiceResult<Vec<Recipe>> {
        let query = RecipeListQuery {
            limit: Some(normalize_limit(query.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT)),
            ..query.clone()
        };
        Ok(self.recipes.list_recipes(&query)?)
    }

    pub fn set_instructions(
        &self,
        id: RecipeId,
        sections: &[SectionDraft],
    ) -> ServiceResult<Vec<InstructionSection>> {
        self.recipes.replace_instructions(id, sections)?;
        Ok(self.recipes.list_instructions(id)?)
    }

    pub fn set_ingredients(
        &self,
        id: RecipeId,
        lines: &[RecipeIngredientDraft],
    ) -> ServiceResult<Vec<IngredientLine>> {
        self.recipes.replace_ingredients(id, lines)?;
        self.resolve_lines(self.recipes.list_ingredients(id)?)
    }

    pub fn set_tags(&self, id: RecipeId, tags: &[String]) -> ServiceResult<Vec<String>> {
        Ok(self.recipes.set_tags(id, tags)?)
    }

    pub fn add_image(&self, id: RecipeId, uri: &str) -> ServiceResult<RecipeImage> {
        let image = RecipeImage::new(id, uri);
        self.recipes.add_image(&image)?;
        Ok(image)
    }

    /// Reads the detail aggregate without touching access time.
    pub fn recipe_detail(&self, id: RecipeId) -> ServiceResult<RecipeDetail> {
        let recipe = self
            .recipes
            .get_recipe(id)?
            .ok_or_else(|| not_found(EntityKind::Recipe, id))?;
        Ok(RecipeDetail {
            images: self.recipes.list_images(id)?,
            sections: self.recipes.list_instructions(id)?,
            ingredients: self.resolve_lines(self.recipes.list_ingredients(id)?)?,
            tags: self.recipes.list_recipe_tags(id)?,
            recipe,
        })
    }

    /// Marks the recipe as accessed, then returns its detail aggregate.
    pub fn open_recipe(&self, id: RecipeId) -> ServiceResult<RecipeDetail> {
        self.recipes.touch_recipe(id)?;
        self.recipe_detail(id)
    }

    /// Increments `times_made` and returns the new count.
    pub fn mark_made(&self, id: RecipeId) -> ServiceResult<u32> {
        let times_made = self.recipes.mark_made(id)?;
        info!("event=recipe_made module=service status=ok recipe_id={id} times_made={times_made}");
        Ok(times_made)
    }

    /// Returns ingredient lines with quantities scaled to `servings`.
    ///
    /// Fails with `InvalidInput` when `servings` is zero or the recipe has no
    /// base serving count.
    pub fn scale_ingredients(
        &self,
        id: RecipeId,
        servings: u32,
    ) -> ServiceResult<Vec<IngredientLine>> {
        let recipe = self
            .recipes
            .get_recipe(id)?
            .ok_or_else(|| not_found(EntityKind::Recipe, id))?;
        let factor = scale_factor(&recipe, servings)?;
        let lines = self.resolve_lines(self.recipes.list_ingredients(id)?)?;
        Ok(lines
            .into_iter()
            .map(|mut line| {
                line.line.quantity *= factor;
                line
            })
            .collect())
    }

    /// Builds the cooking view.
    ///
    /// Lines are scaled when `servings` is given, then converted into
    /// `target` where a stored rate exists. Lines without a rate keep their
    /// own measure and report `converted = false`.
    pub fn cooking_view(
        &self,
        id: RecipeId,
        servings: Option<u32>,
        target: Option<MeasureId>,
    ) -> ServiceResult<Vec<CookingLine>> {
        let lines = match servings {
            Some(servings) => self.scale_ingredients(id, servings)?,
            None => self.recipe_detail(id)?.ingredients,
        };
        let target_measure = match target {
            Some(target) => Some(
                self.measures
                    .get_measure(target)?
                    .ok_or_else(|| not_found(EntityKind::Measure, target))?,
            ),
            None => None,
        };

        let mut view = Vec::with_capacity(lines.len());
        for line in lines {
            view.push(self.cooking_line(line, target_measure.as_ref())?);
        }
        Ok(view)
    }

    fn cooking_line(
        &self,
        ingredient: IngredientLine,
        target: Option<&Measure>,
    ) -> ServiceResult<CookingLine> {
        let quantity = ingredient.line.quantity;
        let unconverted = |ingredient: IngredientLine| CookingLine {
            measure: ingredient.measure.clone(),
            quantity,
            converted: false,
            ingredient,
        };

        let (Some(target), Some(source)) = (target, ingredient.line.measure_id) else {
            return Ok(unconverted(ingredient));
        };
        match convert(&self.measures, quantity, source, target.id) {
            Ok(converted) => Ok(CookingLine {
                quantity: converted,
                measure: Some(target.clone()),
                converted: source != target.id,
                ingredient,
            }),
            Err(ConversionError::MissingRate { .. }) => Ok(unconverted(ingredient)),
            Err(err) => Err(err.into()),
        }
    }

    fn resolve_lines(&self, lines: Vec<RecipeIngredient>) -> ServiceResult<Vec<IngredientLine>> {
        let mut names: HashMap<_, String> = HashMap::new();
        let mut variants: HashMap<_, Vec<IngredientVariant>> = HashMap::new();
        let mut measures: HashMap<MeasureId, Measure> = HashMap::new();
        let mut resolved = Vec::with_capacity(lines.len());

        for line in lines {
            if !names.contains_key(&line.ingredient_id) {
                let ingredient = self
                    .ingredients
                    .get_ingredient(line.ingredient_id)?
                    .ok_or(ServiceError::InconsistentState(
                        "recipe line references a missing ingredient",
                    ))?;
                names.insert(line.ingredient_id, ingredient.name);
            }
            let variant_name = match line.variant_id {
                Some(variant_id) => {
                    if !variants.contains_key(&line.ingredient_id) {
                        let list = self.ingredients.list_variants(line.ingredient_id)?;
                        variants.insert(line.ingredient_id, list);
                    }
                    variants
                        .get(&line.ingredient_id)
                        .and_then(|list| list.iter().find(|v| v.id == variant_id))
                        .map(|v| v.name.clone())
                }
                None => None,
            };
            let measure = match line.measure_id {
                Some(measure_id) => {
                    if !measures.contains_key(&measure_id) {
                        let measure = self.measures.get_measure(measure_id)?.ok_or(
                            ServiceError::InconsistentState(
                                "recipe line references a missing measure",
                            ),
                        )?;
                        measures.insert(measure_id, measure);
                    }
                    measures.get(&measure_id).cloned()
                }
                None => None,
            };

            resolved.push(IngredientLine {
                ingredient_name: names
                    .get(&line.ingredient_id)
                    .cloned()
                    .unwrap_or_default(),
                variant_name,
                measure,
                line,
            });
        }
        Ok(resolved)
    }
}

fn scale_factor(recipe: &Recipe, servings: u32) -> ServiceResult<f64> {
    if servings == 0 {
        return Err(ServiceError::InvalidInput(
            "servings must be at least 1".to_string(),
        ));
    }
    let base = recipe.servings.ok_or_else(|| {
        ServiceError::InvalidInput(format!("recipe {} has no base servings", recipe.id))
    })?;
    Ok(f64::from(servings) / f64::from(base))
}
