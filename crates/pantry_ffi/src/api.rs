//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose one function group per app screen to Dart via FRB.
//! - Translate core errors into envelope messages.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Every DB-backed call opens its own connection and drops it on return.
//! - IDs cross the boundary as UUID strings.

use log::warn;
use pantry_core::identity::{
    redirect_state, AuthorizationSession, IdentityClient, IdentityConfig, ReqwestTransport,
};
use pantry_core::model::meal::MealEntry;
use pantry_core::repo::ingredient_repo::{IngredientListQuery, SqliteIngredientRepository};
use pantry_core::repo::meal_repo::SqliteMealRepository;
use pantry_core::repo::measure_repo::{MeasureRepository, SqliteMeasureRepository};
use pantry_core::repo::recipe_repo::SqliteRecipeRepository;
use pantry_core::repo::shopping_repo::SqliteShoppingRepository;
use pantry_core::repo::{normalize_limit, shopping_repo::ShoppingListSummary};
use pantry_core::service::catalog_service::CatalogService;
use pantry_core::service::home_service::HomeService;
use pantry_core::service::meal_service::MealService;
use pantry_core::service::recipe_service::RecipeService;
use pantry_core::service::shopping_service::{ParseMode, ShoppingService};
use pantry_core::{
    convert_by_label, core_version as core_version_inner, init_logging as init_logging_inner,
    open_db_with, parse_quantity, ping as ping_inner, search_all, CoreConfig, OpenOptions,
    SearchKind, SearchQuery,
};
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

const HOME_SECTION_LIMIT: u32 = 5;
const INGREDIENT_DEFAULT_LIMIT: u32 = 50;
const INGREDIENT_LIMIT_MAX: u32 = 200;
const SEARCH_DEFAULT_LIMIT: u32 = 20;
const SEARCH_LIMIT_MAX: u32 = 50;
const PENDING_LOGIN_MAX: usize = 8;
const PENDING_LOGIN_DEFAULT_TTL_SECS: u64 = 600;

static DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static PENDING_LOGINS: OnceLock<Mutex<PendingLogins>> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Returns empty string on success and an error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Pins the database file used by every later call.
///
/// # FFI contract
/// - Must be called before the first DB-backed call to take effect.
/// - Repeating the same path is accepted; a different path is rejected.
/// - Returns empty string on success and an error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn configure_db_path(path: String) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return "db path cannot be empty".to_string();
    }
    let requested = PathBuf::from(trimmed);
    let active = DB_PATH.get_or_init(|| requested.clone());
    if *active == requested {
        String::new()
    } else {
        format!(
            "db path already configured as `{}`; refusing to switch to `{}`",
            active.display(),
            requested.display()
        )
    }
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    /// Created or affected record ID.
    pub id: Option<String>,
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, id: Option<String>) -> Self {
        Self {
            ok: true,
            id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            message: message.into(),
        }
    }
}

/// Envelope for operations returning one counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountResponse {
    pub ok: bool,
    pub count: u32,
    pub message: String,
}

impl CountResponse {
    fn from_result(result: Result<u32, String>, label: &str) -> Self {
        match result {
            Ok(count) => Self {
                ok: true,
                count,
                message: format!("{label}: {count}"),
            },
            Err(err) => Self {
                ok: false,
                count: 0,
                message: err,
            },
        }
    }
}

// ---- home ----

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeSummaryItem {
    pub id: String,
    pub name: String,
    pub times_made: u32,
    pub date_accessed: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MealEntryItem {
    pub id: String,
    pub name: String,
    pub eaten_at: i64,
    pub note: Option<String>,
    pub recipe_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListSummaryItem {
    pub id: String,
    pub name: String,
    pub item_count: u32,
    pub unchecked_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HomeSnapshotResponse {
    pub ok: bool,
    pub message: String,
    pub recent_recipes: Vec<RecipeSummaryItem>,
    pub most_made_recipes: Vec<RecipeSummaryItem>,
    pub upcoming_meals: Vec<MealEntryItem>,
    pub open_lists: Vec<ShoppingListSummaryItem>,
}

/// Home screen data relative to the current wall-clock time.
#[flutter_rust_bridge::frb(sync)]
pub fn home_snapshot() -> HomeSnapshotResponse {
    let result = with_conn(|conn| {
        let service = HomeService::new(
            SqliteRecipeRepository::try_new(conn).map_err(|err| err.to_string())?,
            SqliteMealRepository::try_new(conn).map_err(|err| err.to_string())?,
            SqliteShoppingRepository::try_new(conn).map_err(|err| err.to_string())?,
        );
        service
            .snapshot(now_epoch_ms(), HOME_SECTION_LIMIT)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(snapshot) => HomeSnapshotResponse {
            ok: true,
            message: "ok".to_string(),
            recent_recipes: snapshot.recent_recipes.into_iter().map(to_recipe_item).collect(),
            most_made_recipes: snapshot
                .most_made_recipes
                .into_iter()
                .map(to_recipe_item)
                .collect(),
            upcoming_meals: snapshot.upcoming_meals.into_iter().map(to_meal_item).collect(),
            open_lists: snapshot.open_lists.into_iter().map(to_list_item).collect(),
        },
        Err(err) => HomeSnapshotResponse {
            message: format!("home_snapshot failed: {err}"),
            ..HomeSnapshotResponse::default()
        },
    }
}

// ---- ingredients ----

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientItem {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientListResponse {
    pub ok: bool,
    pub message: String,
    pub items: Vec<IngredientItem>,
    pub applied_limit: u32,
}

/// Lists ingredients alphabetically, optionally filtered by name prefix.
#[flutter_rust_bridge::frb(sync)]
pub fn ingredients_list(prefix: Option<String>, limit: Option<u32>) -> IngredientListResponse {
    let applied_limit = normalize_limit(limit, INGREDIENT_DEFAULT_LIMIT, INGREDIENT_LIMIT_MAX);
    let result = with_catalog(|service| {
        service.list_ingredients(&IngredientListQuery {
            name_prefix: prefix,
            limit: Some(applied_limit),
            ..IngredientListQuery::default()
        })
    });
    match result {
        Ok(items) => IngredientListResponse {
            ok: true,
            message: format!("{} ingredient(s).", items.len()),
            items: items
                .into_iter()
                .map(|ingredient| IngredientItem {
                    id: ingredient.id.to_string(),
                    name: ingredient.name,
                    description: ingredient.description,
                })
                .collect(),
            applied_limit,
        },
        Err(err) => IngredientListResponse {
            ok: false,
            message: format!("ingredients_list failed: {err}"),
            items: Vec::new(),
            applied_limit,
        },
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn ingredient_create(name: String, description: Option<String>) -> ActionResponse {
    match with_catalog(|service| service.create_ingredient(&name, description)) {
        Ok(ingredient) => {
            ActionResponse::success("Ingredient created.", Some(ingredient.id.to_string()))
        }
        Err(err) => ActionResponse::failure(format!("ingredient_create failed: {err}")),
    }
}

/// Deletes an ingredient; fails while recipes still use it.
#[flutter_rust_bridge::frb(sync)]
pub fn ingredient_delete(ingredient_id: String) -> ActionResponse {
    let result = parse_id(&ingredient_id, "ingredient_id")
        .and_then(|id| with_catalog(|service| service.delete_ingredient(id)));
    match result {
        Ok(()) => ActionResponse::success("Ingredient deleted.", Some(ingredient_id)),
        Err(err) => ActionResponse::failure(format!("ingredient_delete failed: {err}")),
    }
}

// ---- ingredient detail ----

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedItem {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IngredientDetailResponse {
    pub ok: bool,
    pub message: String,
    pub ingredient: Option<IngredientItem>,
    pub variants: Vec<NamedItem>,
    pub image_uris: Vec<String>,
}

/// Opens the ingredient detail screen and records the access time.
#[flutter_rust_bridge::frb(sync)]
pub fn ingredient_detail(ingredient_id: String) -> IngredientDetailResponse {
    let result = parse_id(&ingredient_id, "ingredient_id")
        .and_then(|id| with_catalog(|service| service.open_ingredient(id)));
    match result {
        Ok(detail) => IngredientDetailResponse {
            ok: true,
            message: "ok".to_string(),
            ingredient: Some(IngredientItem {
                id: detail.ingredient.id.to_string(),
                name: detail.ingredient.name,
                description: detail.ingredient.description,
            }),
            variants: detail
                .variants
                .into_iter()
                .map(|variant| NamedItem {
                    id: variant.id.to_string(),
                    name: variant.name,
                })
                .collect(),
            image_uris: detail.images.into_iter().map(|image| image.uri).collect(),
        },
        Err(err) => IngredientDetailResponse {
            message: format!("ingredient_detail failed: {err}"),
            ..IngredientDetailResponse::default()
        },
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn ingredient_add_variant(ingredient_id: String, name: String) -> ActionResponse {
    let result = parse_id(&ingredient_id, "ingredient_id")
        .and_then(|id| with_catalog(|service| service.add_variant(id, &name)));
    match result {
        Ok(variant) => ActionResponse::success("Variant added.", Some(variant.id.to_string())),
        Err(err) => ActionResponse::failure(format!("ingredient_add_variant failed: {err}")),
    }
}

// ---- shopping lists ----

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListsResponse {
    pub ok: bool,
    pub message: String,
    pub items: Vec<ShoppingListSummaryItem>,
}

#[flutter_rust_bridge::frb(sync)]
pub fn shopping_lists() -> ShoppingListsResponse {
    match with_shopping(|service| service.list_lists()) {
        Ok(lists) => ShoppingListsResponse {
            ok: true,
            message: format!("{} list(s).", lists.len()),
            items: lists.into_iter().map(to_list_item).collect(),
        },
        Err(err) => ShoppingListsResponse {
            ok: false,
            message: format!("shopping_lists failed: {err}"),
            items: Vec::new(),
        },
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn shopping_list_create(name: String) -> ActionResponse {
    match with_shopping(|service| service.create_list(&name)) {
        Ok(list) => ActionResponse::success("List created.", Some(list.id.to_string())),
        Err(err) => ActionResponse::failure(format!("shopping_list_create failed: {err}")),
    }
}

// ---- shopping list detail ----

#[derive(Debug, Clone, PartialEq)]
pub struct ShoppingItemView {
    pub id: String,
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub checked: bool,
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShoppingListDetailResponse {
    pub ok: bool,
    pub message: String,
    pub list_id: String,
    pub name: String,
    /// Unchecked items first, each group in insertion order.
    pub items: Vec<ShoppingItemView>,
}

#[flutter_rust_bridge::frb(sync)]
pub fn shopping_list_detail(list_id: String) -> ShoppingListDetailResponse {
    let result = parse_id(&list_id, "list_id")
        .and_then(|id| with_shopping(|service| service.list_detail(id)));
    match result {
        Ok(detail) => ShoppingListDetailResponse {
            ok: true,
            message: format!("{} item(s).", detail.items.len()),
            list_id: detail.list.id.to_string(),
            name: detail.list.name,
            items: detail
                .items
                .into_iter()
                .map(|item| ShoppingItemView {
                    id: item.id.to_string(),
                    name: item.name,
                    quantity: item.quantity,
                    unit: item.unit,
                    checked: item.checked,
                    position: item.position,
                })
                .collect(),
        },
        Err(err) => ShoppingListDetailResponse {
            message: format!("shopping_list_detail failed: {err}"),
            ..ShoppingListDetailResponse::default()
        },
    }
}

/// Adds an item typed as free text (`20kg potatoes`, `milk 1 l`).
///
/// With `lenient`, text the parser rejects is stored as a name-only item.
#[flutter_rust_bridge::frb(sync)]
pub fn shopping_item_add_text(list_id: String, text: String, lenient: bool) -> ActionResponse {
    let mode = if lenient {
        ParseMode::Lenient
    } else {
        ParseMode::Strict
    };
    let result = parse_id(&list_id, "list_id")
        .and_then(|id| with_shopping(|service| service.add_item_from_text(id, &text, mode)));
    match result {
        Ok(item) => ActionResponse::success("Item added.", Some(item.id.to_string())),
        Err(err) => ActionResponse::failure(format!("shopping_item_add_text failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn shopping_item_toggle(item_id: String, checked: bool) -> ActionResponse {
    let result = parse_id(&item_id, "item_id")
        .and_then(|id| with_shopping(|service| service.set_item_checked(id, checked)));
    match result {
        Ok(()) => ActionResponse::success("Item updated.", Some(item_id)),
        Err(err) => ActionResponse::failure(format!("shopping_item_toggle failed: {err}")),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeMergeResponse {
    pub ok: bool,
    pub message: String,
    pub added: u32,
    pub merged: u32,
}

#[flutter_rust_bridge::frb(sync)]
pub fn shopping_list_add_recipe(list_id: String, recipe_id: String) -> RecipeMergeResponse {
    let result = parse_id(&list_id, "list_id").and_then(|list_id| {
        let recipe_id = parse_id(&recipe_id, "recipe_id")?;
        with_shopping(|service| service.add_recipe_to_list(list_id, recipe_id))
    });
    match result {
        Ok(report) => RecipeMergeResponse {
            ok: true,
            message: format!("{} added, {} merged.", report.added, report.merged),
            added: report.added,
            merged: report.merged,
        },
        Err(err) => RecipeMergeResponse {
            ok: false,
            message: format!("shopping_list_add_recipe failed: {err}"),
            added: 0,
            merged: 0,
        },
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn shopping_clear_checked(list_id: String) -> CountResponse {
    let result = parse_id(&list_id, "list_id")
        .and_then(|id| with_shopping(|service| service.clear_checked(id)))
        .map_err(|err| format!("shopping_clear_checked failed: {err}"));
    CountResponse::from_result(result, "Removed")
}

// ---- cooking ----

#[derive(Debug, Clone, PartialEq)]
pub struct CookingLineItem {
    pub ingredient_name: String,
    pub variant_name: Option<String>,
    pub quantity: f64,
    pub unit: Option<String>,
    pub note: Option<String>,
    pub converted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookingSectionItem {
    pub name: Option<String>,
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CookingViewResponse {
    pub ok: bool,
    pub message: String,
    pub recipe_name: String,
    pub servings: Option<u32>,
    pub lines: Vec<CookingLineItem>,
    pub sections: Vec<CookingSectionItem>,
}

/// Opens a recipe for cooking.
///
/// `servings` rescales quantities; `target_unit` (name or abbreviation)
/// converts lines that have a stored rate into that measure.
#[flutter_rust_bridge::frb(sync)]
pub fn cooking_view(
    recipe_id: String,
    servings: Option<u32>,
    target_unit: Option<String>,
) -> CookingViewResponse {
    let result = parse_id(&recipe_id, "recipe_id").and_then(|id| {
        with_conn(|conn| {
            let measures = SqliteMeasureRepository::try_new(conn).map_err(|err| err.to_string())?;
            let target = match target_unit.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
                Some(label) => Some(
                    measures
                        .find_measure_by_label(label)
                        .map_err(|err| err.to_string())?
                        .ok_or_else(|| format!("unknown measure: `{label}`"))?
                        .id,
                ),
                None => None,
            };
            let service = RecipeService::new(
                SqliteRecipeRepository::try_new(conn).map_err(|err| err.to_string())?,
                SqliteIngredientRepository::try_new(conn).map_err(|err| err.to_string())?,
                measures,
            );
            let detail = service.open_recipe(id).map_err(|err| err.to_string())?;
            let lines = service
                .cooking_view(id, servings, target)
                .map_err(|err| err.to_string())?;
            Ok((detail, lines))
        })
    });

    match result {
        Ok((detail, lines)) => CookingViewResponse {
            ok: true,
            message: "ok".to_string(),
            recipe_name: detail.recipe.name,
            servings: servings.or(detail.recipe.servings),
            lines: lines
                .into_iter()
                .map(|line| CookingLineItem {
                    ingredient_name: line.ingredient.ingredient_name,
                    variant_name: line.ingredient.variant_name,
                    quantity: line.quantity,
                    unit: line.measure.map(|measure| measure.abbreviation),
                    note: line.ingredient.line.note,
                    converted: line.converted,
                })
                .collect(),
            sections: detail
                .sections
                .into_iter()
                .map(|section| CookingSectionItem {
                    name: section.name,
                    steps: section.steps.into_iter().map(|step| step.text).collect(),
                })
                .collect(),
        },
        Err(err) => CookingViewResponse {
            message: format!("cooking_view failed: {err}"),
            ..CookingViewResponse::default()
        },
    }
}

/// Increments the recipe's cooked counter.
#[flutter_rust_bridge::frb(sync)]
pub fn recipe_mark_made(recipe_id: String) -> CountResponse {
    let result = parse_id(&recipe_id, "recipe_id")
        .and_then(|id| with_recipes(|service| service.mark_made(id)))
        .map_err(|err| format!("recipe_mark_made failed: {err}"));
    CountResponse::from_result(result, "Times made")
}

// ---- meal entries ----

/// Logs a meal.
///
/// With `recipe_id`, the entry copies the recipe's ingredients and bumps its
/// cooked counter; `name` is then ignored in favor of the recipe name.
#[flutter_rust_bridge::frb(sync)]
pub fn meal_entry_log(
    name: String,
    eaten_at: i64,
    recipe_id: Option<String>,
    note: Option<String>,
    tags: Vec<String>,
) -> ActionResponse {
    let recipe_id = match recipe_id.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => match parse_id(raw, "recipe_id") {
            Ok(id) => Some(id),
            Err(err) => return ActionResponse::failure(format!("meal_entry_log failed: {err}")),
        },
        None => None,
    };

    let result = with_meals(|service| match recipe_id {
        Some(recipe_id) => {
            let detail = service.log_recipe_meal(recipe_id, eaten_at, note)?;
            if !tags.is_empty() {
                service.set_entry_tags(detail.entry.id, &tags)?;
            }
            Ok(detail.entry.id)
        }
        None => {
            let mut entry = MealEntry::new(name.as_str(), eaten_at);
            entry.note = note.filter(|value| !value.trim().is_empty());
            Ok(service.log_meal(&entry, &tags, &[])?.entry.id)
        }
    });
    match result {
        Ok(id) => ActionResponse::success("Meal logged.", Some(id.to_string())),
        Err(err) => ActionResponse::failure(format!("meal_entry_log failed: {err}")),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MealEntriesResponse {
    pub ok: bool,
    pub message: String,
    pub items: Vec<MealEntryItem>,
}

/// Entries with `from_epoch_ms <= eaten_at < to_epoch_ms`, oldest first.
#[flutter_rust_bridge::frb(sync)]
pub fn meal_entries_between(from_epoch_ms: i64, to_epoch_ms: i64) -> MealEntriesResponse {
    match with_meals(|service| service.list_between(from_epoch_ms, to_epoch_ms)) {
        Ok(entries) => MealEntriesResponse {
            ok: true,
            message: format!("{} entry(ies).", entries.len()),
            items: entries.into_iter().map(to_meal_item).collect(),
        },
        Err(err) => MealEntriesResponse {
            ok: false,
            message: format!("meal_entries_between failed: {err}"),
            items: Vec::new(),
        },
    }
}

// ---- utilities ----

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParseQuantityResponse {
    pub ok: bool,
    pub message: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub name: Option<String>,
}

/// Parses `20kg potatoes` / `potatoes 20 kg` without touching storage.
#[flutter_rust_bridge::frb(sync)]
pub fn parse_quantity_text(text: String) -> ParseQuantityResponse {
    match parse_quantity(&text) {
        Ok(parsed) => ParseQuantityResponse {
            ok: true,
            message: "ok".to_string(),
            quantity: Some(parsed.quantity),
            unit: Some(parsed.unit),
            name: Some(parsed.name),
        },
        Err(err) => ParseQuantityResponse {
            message: err.to_string(),
            ..ParseQuantityResponse::default()
        },
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConvertResponse {
    pub ok: bool,
    pub message: String,
    pub amount: Option<f64>,
    /// Abbreviation of the target measure.
    pub unit: Option<String>,
}

/// Converts `amount` between two measures named by name or abbreviation.
#[flutter_rust_bridge::frb(sync)]
pub fn convert_amount(amount: f64, from_unit: String, to_unit: String) -> ConvertResponse {
    let result = with_conn(|conn| {
        let measures = SqliteMeasureRepository::try_new(conn).map_err(|err| err.to_string())?;
        convert_by_label(&measures, amount, &from_unit, &to_unit).map_err(|err| err.to_string())
    });
    match result {
        Ok((converted, measure)) => ConvertResponse {
            ok: true,
            message: "ok".to_string(),
            amount: Some(converted),
            unit: Some(measure.abbreviation),
        },
        Err(err) => ConvertResponse {
            message: format!("convert_amount failed: {err}"),
            ..ConvertResponse::default()
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchItem {
    pub id: String,
    /// `recipe` or `ingredient`.
    pub kind: String,
    pub name: String,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResponse {
    pub items: Vec<SearchItem>,
    pub message: String,
    pub applied_limit: u32,
}

/// Keyword search over recipes and ingredients.
///
/// `kind` filters to `recipe` or `ingredient`; any other value is rejected.
#[flutter_rust_bridge::frb(sync)]
pub fn search(text: String, kind: Option<String>, limit: Option<u32>) -> SearchResponse {
    let applied_limit = normalize_limit(limit, SEARCH_DEFAULT_LIMIT, SEARCH_LIMIT_MAX);
    let failure = |message: String| SearchResponse {
        items: Vec::new(),
        message: format!("search failed: {message}"),
        applied_limit,
    };

    let kind = match kind.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        None => None,
        Some(value) => match value.parse::<SearchKind>() {
            Ok(kind) => Some(kind),
            Err(err) => return failure(err.to_string()),
        },
    };
    let query = SearchQuery {
        text: text.trim().to_string(),
        kind,
        limit: applied_limit,
        raw_fts_syntax: false,
    };

    match with_conn(|conn| search_all(conn, &query).map_err(|err| err.to_string())) {
        Ok(hits) => {
            let message = if hits.is_empty() {
                "No results.".to_string()
            } else {
                format!("Found {} result(s).", hits.len())
            };
            SearchResponse {
                items: hits
                    .into_iter()
                    .map(|hit| SearchItem {
                        id: hit.id.to_string(),
                        kind: hit.kind.as_str().to_string(),
                        name: hit.name,
                        snippet: hit.snippet,
                    })
                    .collect(),
                message,
                applied_limit,
            }
        }
        Err(err) => failure(err),
    }
}

// ---- identity ----

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoginBeginResponse {
    pub ok: bool,
    pub message: String,
    /// URL to open in the system browser.
    pub authorize_url: Option<String>,
    pub did: Option<String>,
}

/// Resolves `handle_or_did` and prepares the browser authorization step.
///
/// The PKCE verifier stays in process memory until
/// [`identity_complete_login`] consumes it.
#[flutter_rust_bridge::frb(sync)]
pub fn identity_begin_login(handle_or_did: String) -> LoginBeginResponse {
    let result = identity_client().and_then(|client| {
        client
            .begin_login(&handle_or_did)
            .map_err(|err| err.to_string())
    });
    let session = match result {
        Ok(session) => session,
        Err(err) => {
            return LoginBeginResponse {
                message: format!("identity_begin_login failed: {err}"),
                ..LoginBeginResponse::default()
            }
        }
    };

    let response = LoginBeginResponse {
        ok: true,
        message: "Open the authorization URL to continue.".to_string(),
        authorize_url: Some(session.authorize_url.clone()),
        did: Some(session.did.clone()),
    };
    match pending_logins().lock() {
        Ok(mut pending) => {
            pending.insert(session, now_epoch_ms());
            response
        }
        Err(_) => LoginBeginResponse {
            message: "identity_begin_login failed: pending login store unavailable".to_string(),
            ..LoginBeginResponse::default()
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoginCompleteResponse {
    pub ok: bool,
    pub message: String,
    pub did: Option<String>,
    pub handle: Option<String>,
    pub pds: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
}

/// Completes a login from the full redirect URL received by the app.
#[flutter_rust_bridge::frb(sync)]
pub fn identity_complete_login(redirect_url: String) -> LoginCompleteResponse {
    let failure = |message: String| LoginCompleteResponse {
        message: format!("identity_complete_login failed: {message}"),
        ..LoginCompleteResponse::default()
    };

    let Some(state) = redirect_state(&redirect_url) else {
        return failure("redirect has no state".to_string());
    };
    let session = match pending_logins().lock() {
        Ok(mut pending) => pending.take(&state, now_epoch_ms()),
        Err(_) => return failure("pending login store unavailable".to_string()),
    };
    let Some(session) = session else {
        warn!("event=identity_complete module=ffi status=error reason=unknown_state");
        return failure("no pending login for this redirect".to_string());
    };

    let result = identity_client().and_then(|client| {
        client
            .complete_from_redirect(&session, &redirect_url)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(login) => LoginCompleteResponse {
            ok: true,
            message: "Signed in.".to_string(),
            did: Some(login.did),
            handle: login.handle,
            pds: Some(login.pds),
            access_token: Some(login.access_token),
            refresh_token: login.refresh_token,
            expires_in: login.expires_in,
        },
        Err(err) => failure(err),
    }
}

// ---- plumbing ----

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| CoreConfig::from_env().db_path)
        .clone()
}

fn with_conn<T>(f: impl FnOnce(&Connection) -> Result<T, String>) -> Result<T, String> {
    let db_path = resolve_db_path();
    let conn = open_db_with(&db_path, OpenOptions::app_default())
        .map_err(|err| format!("DB open failed: {err}"))?;
    f(&conn)
}

type Catalog<'conn> =
    CatalogService<SqliteIngredientRepository<'conn>, SqliteMeasureRepository<'conn>>;
type Recipes<'conn> = RecipeService<
    SqliteRecipeRepository<'conn>,
    SqliteIngredientRepository<'conn>,
    SqliteMeasureRepository<'conn>,
>;
type Shopping<'conn> = ShoppingService<
    SqliteShoppingRepository<'conn>,
    SqliteRecipeRepository<'conn>,
    SqliteIngredientRepository<'conn>,
    SqliteMeasureRepository<'conn>,
>;
type Meals<'conn> = MealService<
    SqliteMealRepository<'conn>,
    SqliteRecipeRepository<'conn>,
    SqliteIngredientRepository<'conn>,
>;

fn with_catalog<T>(
    f: impl FnOnce(&Catalog<'_>) -> pantry_core::ServiceResult<T>,
) -> Result<T, String> {
    with_conn(|conn| {
        let service = CatalogService::new(
            SqliteIngredientRepository::try_new(conn).map_err(|err| err.to_string())?,
            SqliteMeasureRepository::try_new(conn).map_err(|err| err.to_string())?,
        );
        f(&service).map_err(|err| err.to_string())
    })
}

fn with_recipes<T>(
    f: impl FnOnce(&Recipes<'_>) -> pantry_core::ServiceResult<T>,
) -> Result<T, String> {
    with_conn(|conn| {
        let service = RecipeService::new(
            SqliteRecipeRepository::try_new(conn).map_err(|err| err.to_string())?,
            SqliteIngredientRepository::try_new(conn).map_err(|err| err.to_string())?,
            SqliteMeasureRepository::try_new(conn).map_err(|err| err.to_string())?,
        );
        f(&service).map_err(|err| err.to_string())
    })
}

fn with_shopping<T>(
    f: impl FnOnce(&Shopping<'_>) -> pantry_core::ServiceResult<T>,
) -> Result<T, String> {
    with_conn(|conn| {
        let service = ShoppingService::new(
            SqliteShoppingRepository::try_new(conn).map_err(|err| err.to_string())?,
            SqliteRecipeRepository::try_new(conn).map_err(|err| err.to_string())?,
            SqliteIngredientRepository::try_new(conn).map_err(|err| err.to_string())?,
            SqliteMeasureRepository::try_new(conn).map_err(|err| err.to_string())?,
        );
        f(&service).map_err(|err| err.to_string())
    })
}

fn with_meals<T>(f: impl FnOnce(&Meals<'_>) -> pantry_core::ServiceResult<T>) -> Result<T, String> {
    with_conn(|conn| {
        let service = MealService::new(
            SqliteMealRepository::try_new(conn).map_err(|err| err.to_string())?,
            SqliteRecipeRepository::try_new(conn).map_err(|err| err.to_string())?,
            SqliteIngredientRepository::try_new(conn).map_err(|err| err.to_string())?,
        );
        f(&service).map_err(|err| err.to_string())
    })
}

fn identity_client() -> Result<IdentityClient<ReqwestTransport>, String> {
    let transport = ReqwestTransport::new().map_err(|err| err.to_string())?;
    let config = IdentityConfig::from(&CoreConfig::from_env());
    Ok(IdentityClient::new(transport, config))
}

fn pending_logins() -> &'static Mutex<PendingLogins> {
    PENDING_LOGINS.get_or_init(|| Mutex::new(PendingLogins::default()))
}

/// Authorization sessions waiting for their redirect, keyed by `state`.
///
/// Entries expire with the pushed request; at most `PENDING_LOGIN_MAX` are
/// kept and the one closest to expiry is dropped first.
#[derive(Default)]
struct PendingLogins {
    sessions: HashMap<String, (AuthorizationSession, i64)>,
}

impl PendingLogins {
    fn insert(&mut self, session: AuthorizationSession, now_ms: i64) {
        self.sessions.retain(|_, (_, expires_at)| *expires_at > now_ms);
        while self.sessions.len() >= PENDING_LOGIN_MAX {
            let oldest = self
                .sessions
                .iter()
                .min_by_key(|(_, (_, expires_at))| *expires_at)
                .map(|(state, _)| state.clone());
            let Some(oldest) = oldest else { break };
            self.sessions.remove(&oldest);
            warn!("event=identity_begin module=ffi status=evicted reason=pending_limit");
        }

        let ttl_secs = session
            .expires_in
            .unwrap_or(PENDING_LOGIN_DEFAULT_TTL_SECS);
        let ttl_ms = i64::try_from(ttl_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        let expires_at = now_ms.saturating_add(ttl_ms);
        self.sessions
            .insert(session.state.clone(), (session, expires_at));
    }

    fn take(&mut self, state: &str, now_ms: i64) -> Option<AuthorizationSession> {
        let (session, expires_at) = self.sessions.remove(state)?;
        (expires_at > now_ms).then_some(session)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.sessions.len()
    }
}

fn parse_id(raw: &str, field: &str) -> Result<Uuid, String> {
    Uuid::parse_str(raw.trim()).map_err(|_| format!("invalid {field}: `{}`", raw.trim()))
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

fn to_recipe_item(recipe: pantry_core::model::recipe::Recipe) -> RecipeSummaryItem {
    RecipeSummaryItem {
        id: recipe.id.to_string(),
        name: recipe.name,
        times_made: recipe.times_made,
        date_accessed: recipe.date_accessed,
    }
}

fn to_meal_item(entry: MealEntry) -> MealEntryItem {
    MealEntryItem {
        id: entry.id.to_string(),
        name: entry.name,
        eaten_at: entry.eaten_at,
        note: entry.note,
        recipe_id: entry.recipe_id.map(|id| id.to_string()),
    }
}

fn to_list_item(summary: ShoppingListSummary) -> ShoppingListSummaryItem {
    ShoppingListSummaryItem {
        id: summary.list.id.to_string(),
        name: summary.list.name,
        item_count: summary.item_count,
        unchecked_count: summary.unchecked_count,
    }
}
