//! Home screen snapshot.

use crate::model::meal::MealEntry;
use crate::model::recipe::Recipe;
use crate::repo::meal_repo::MealRepository;
use crate::repo::recipe_repo::{RecipeListQuery, RecipeRepository, RecipeSort};
use crate::repo::shopping_repo::{ShoppingListSummary, ShoppingRepository};
use crate::service::ServiceResult;

/// Window for "upcoming" meal entries.
pub const UPCOMING_WINDOW_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Data rendered by the home screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeSnapshot {
    /// Opened recipes, most recent first.
    pub recent_recipes: Vec<Recipe>,
    /// Recipes cooked at least once, most cooked first.
    pub most_made_recipes: Vec<Recipe>,
    /// Entries in `[now, now + UPCOMING_WINDOW_MS)`.
    pub upcoming_meals: Vec<MealEntry>,
    /// Lists with at least one unchecked item.
    pub open_lists: Vec<ShoppingListSummary>,
}

pub struct HomeService<R: RecipeRepository, E: MealRepository, S: ShoppingRepository> {
    recipes: R,
    meals: E,
    lists: S,
}

impl<R, E, S> HomeService<R, E, S>
where
    R: RecipeRepository,
    E: MealRepository,
    S: ShoppingRepository,
{
    pub fn new(recipes: R, meals: E, lists: S) -> Self {
        Self {
            recipes,
            meals,
            lists,
        }
    }

    /// Builds the snapshot relative to `now` (epoch ms), `limit` rows per section.
    pub fn snapshot(&self, now: i64, limit: u32) -> ServiceResult<HomeSnapshot> {
        let recent_recipes = self
            .recipes
            .list_recipes(&RecipeListQuery {
                sort: RecipeSort::RecentlyAccessed,
                limit: Some(limit),
                ..RecipeListQuery::default()
            })?
            .into_iter()
            .filter(|recipe| recipe.date_accessed.is_some())
            .collect();
        let most_made_recipes = self
            .recipes
            .list_recipes(&RecipeListQuery {
                sort: RecipeSort::MostMade,
                limit: Some(limit),
                ..RecipeListQuery::default()
            })?
            .into_iter()
            .filter(|recipe| recipe.times_made > 0)
            .collect();
        let upcoming_meals = self
            .meals
            .list_entries_between(now, now.saturating_add(UPCOMING_WINDOW_MS))?
            .into_iter()
            .take(limit as usize)
            .collect();
        let open_lists = self
            .lists
            .list_lists()?
            .into_iter()
            .filter(|summary| summary.unchecked_count > 0)
            .take(limit as usize)
            .collect();

        Ok(HomeSnapshot {
            recent_recipes,
            most_made_recipes,
            upcoming_meals,
            open_lists,
        })
    }
}
