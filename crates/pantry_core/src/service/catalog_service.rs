//! Ingredient and measure catalog service.
//!
//! # Responsibility
//! - Build ingredient detail aggregates for detail screens.
//! - Manage measures and their conversion rates.
//!
//! # Invariants
//! - Opening a detail view stamps `date_accessed`; plain reads do not.

use crate::conversion::convert;
use crate::model::ingredient::{Ingredient, IngredientId, IngredientImage, IngredientVariant};
use crate::model::measure::{Measure, MeasureConversion, MeasureId};
use crate::repo::ingredient_repo::{IngredientListQuery, IngredientRepository};
use crate::repo::measure_repo::MeasureRepository;
use crate::repo::{normalize_limit, EntityKind};
use crate::service::{not_found, ServiceError, ServiceResult};
use log::info;

const DEFAULT_LIST_LIMIT: u32 = 50;
const MAX_LIST_LIMIT: u32 = 200;

/// Ingredient with its variants and images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientDetail {
    pub ingredient: Ingredient,
    pub variants: Vec<IngredientVariant>,
    pub images: Vec<IngredientImage>,
}

/// Catalog facade over ingredient and measure repositories.
pub struct CatalogService<I: IngredientRepository, M: MeasureRepository> {
    ingredients: I,
    measures: M,
}

impl<I: IngredientRepository, M: MeasureRepository> CatalogService<I, M> {
    pub fn new(ingredients: I, measures: M) -> Self {
        Self {
            ingredients,
            measures,
        }
    }

    /// Creates one ingredient and returns the stored record.
    pub fn create_ingredient(
        &self,
        name: &str,
        description: Option<String>,
    ) -> ServiceResult<Ingredient> {
        let mut ingredient = Ingredient::new(name);
        ingredient.description = description
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let id = self.ingredients.create_ingredient(&ingredient)?;
        info!("event=ingredient_create module=service status=ok ingredient_id={id}");
        self.ingredients
            .get_ingredient(id)?
            .ok_or(ServiceError::InconsistentState(
                "created ingredient not found in read-back",
            ))
    }

    pub fn update_ingredient(&self, ingredient: &Ingredient) -> ServiceResult<Ingredient> {
        self.ingredients.update_ingredient(ingredient)?;
        self.ingredients
            .get_ingredient(ingredient.id)?
            .ok_or(ServiceError::InconsistentState(
                "updated ingredient not found in read-back",
            ))
    }

    pub fn delete_ingredient(&self, id: IngredientId) -> ServiceResult<()> {
        self.ingredients.delete_ingredient(id)?;
        info!("event=ingredient_delete module=service status=ok ingredient_id={id}");
        Ok(())
    }

    /// Lists ingredients with a clamped page size.
    pub fn list_ingredients(&self, query: &IngredientListQuery) -> ServiceResult<Vec<Ingredient>> {
        let query = IngredientListQuery {
            limit: Some(normalize_limit(query.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT)),
            ..query.clone()
        };
        Ok(self.ingredients.list_ingredients(&query)?)
    }

    /// Reads the detail aggregate without touching access time.
    pub fn ingredient_detail(&self, id: IngredientId) -> ServiceResult<IngredientDetail> {
        let ingredient = self
            .ingredients
            .get_ingredient(id)?
            .ok_or_else(|| not_found(EntityKind::Ingredient, id))?;
        Ok(IngredientDetail {
            variants: self.ingredients.list_variants(id)?,
            images: self.ingredients.list_images(id)?,
            ingredient,
        })
    }

    /// Marks the ingredient as accessed, then returns its detail aggregate.
    pub fn open_ingredient(&self, id: IngredientId) -> ServiceResult<IngredientDetail> {
        self.ingredients.touch_ingredient(id)?;
        self.ingredient_detail(id)
    }

    pub fn add_variant(&self, id: IngredientId, name: &str) -> ServiceResult<IngredientVariant> {
        let variant = IngredientVariant::new(id, name);
        self.ingredients.add_variant(&variant)?;
        Ok(variant)
    }

    pub fn add_image(&self, id: IngredientId, uri: &str) -> ServiceResult<IngredientImage> {
        let image = IngredientImage::new(id, uri);
        self.ingredients.add_image(&image)?;
        Ok(image)
    }

    /// Creates one measure and returns the stored record.
    pub fn create_measure(&self, name: &str, abbreviation: &str) -> ServiceResult<Measure> {
        let measure = Measure::new(name, abbreviation);
        let id = self.measures.create_measure(&measure)?;
        info!("event=measure_create module=service status=ok measure_id={id}");
        self.measures
            .get_measure(id)?
            .ok_or(ServiceError::InconsistentState(
                "created measure not found in read-back",
            ))
    }

    pub fn list_measures(&self) -> ServiceResult<Vec<Measure>> {
        Ok(self.measures.list_measures()?)
    }

    /// Stores a directed rate, plus its reciprocal when `with_inverse` is set.
    pub fn set_conversion(
        &self,
        from: MeasureId,
        to: MeasureId,
        rate: f64,
        with_inverse: bool,
    ) -> ServiceResult<MeasureConversion> {
        let conversion = MeasureConversion::new(from, to, rate);
        if with_inverse {
            self.measures.set_conversion_pair(&conversion)?;
        } else {
            self.measures.set_conversion(&conversion)?;
        }
        info!(
            "event=conversion_set module=service status=ok from={from} to={to} inverse={with_inverse}"
        );
        Ok(conversion)
    }

    pub fn list_conversions(&self, from: Option<MeasureId>) -> ServiceResult<Vec<MeasureConversion>> {
        Ok(self.measures.list_conversions(from)?)
    }

    pub fn convert(&self, amount: f64, from: MeasureId, to: MeasureId) -> ServiceResult<f64> {
        Ok(convert(&self.measures, amount, from, to)?)
    }
}
