use pantry_core::db::open_db_in_memory;
use pantry_core::model::meal::{MealEntry, MealEntryIngredient};
use pantry_core::model::recipe::{Recipe, RecipeIngredientDraft, SectionDraft};
use pantry_core::repo::ingredient_repo::SqliteIngredientRepository;
use pantry_core::repo::meal_repo::SqliteMealRepository;
use pantry_core::repo::measure_repo::SqliteMeasureRepository;
use pantry_core::repo::recipe_repo::SqliteRecipeRepository;
use pantry_core::repo::shopping_repo::SqliteShoppingRepository;
use pantry_core::service::catalog_service::CatalogService;
use pantry_core::service::home_service::{HomeService, UPCOMING_WINDOW_MS};
use pantry_core::service::meal_service::MealService;
use pantry_core::service::recipe_service::RecipeService;
use pantry_core::service::shopping_service::{ParseMode, ShoppingService};
use pantry_core::{EntityKind, QuantityParseError, ServiceError};
use rusqlite::Connection;

type Catalog<'c> = CatalogService<SqliteIngredientRepository<'c>, SqliteMeasureRepository<'c>>;
type Recipes<'c> = RecipeService<
    SqliteRecipeRepository<'c>,
    SqliteIngredientRepository<'c>,
    SqliteMeasureRepository<'c>,
>;
type Shopping<'c> = ShoppingService<
    SqliteShoppingRepository<'c>,
    SqliteRecipeRepository<'c>,
    SqliteIngredientRepository<'c>,
    SqliteMeasureRepository<'c>,
>;

fn catalog(conn: &Connection) -> Catalog<'_> {
    CatalogService::new(
        SqliteIngredientRepository::try_new(conn).unwrap(),
        SqliteMeasureRepository::try_new(conn).unwrap(),
    )
}

fn recipes(conn: &Connection) -> Recipes<'_> {
    RecipeService::new(
        SqliteRecipeRepository::try_new(conn).unwrap(),
        SqliteIngredientRepository::try_new(conn).unwrap(),
        SqliteMeasureRepository::try_new(conn).unwrap(),
    )
}

fn shopping(conn: &Connection) -> Shopping<'_> {
    ShoppingService::new(
        SqliteShoppingRepository::try_new(conn).unwrap(),
        SqliteRecipeRepository::try_new(conn).unwrap(),
        SqliteIngredientRepository::try_new(conn).unwrap(),
        SqliteMeasureRepository::try_new(conn).unwrap(),
    )
}

/// Pancakes for 4: 200 g flour, 2 egg, 300 ml milk, and 100 g more flour.
fn seed_pancakes(conn: &Connection) -> Recipe {
    let catalog = catalog(conn);
    let gram = catalog.create_measure("gram", "g").unwrap();
    let kilogram = catalog.create_measure("kilogram", "kg").unwrap();
    let millilitre = catalog.create_measure("millilitre", "ml").unwrap();
    catalog
        .set_conversion(gram.id, kilogram.id, 0.001, true)
        .unwrap();

    let flour = catalog.create_ingredient("flour", None).unwrap();
    let egg = catalog.create_ingredient("egg", None).unwrap();
    let milk = catalog.create_ingredient("milk", None).unwrap();

    let recipes = recipes(conn);
    let mut pancakes = Recipe::new("Pancakes");
    pancakes.servings = Some(4);
    let pancakes = recipes.create_recipe(&pancakes).unwrap();
    recipes
        .set_ingredients(
            pancakes.id,
            &[
                RecipeIngredientDraft::new(flour.id, 200.0, Some(gram.id)),
                RecipeIngredientDraft::new(egg.id, 2.0, None),
                RecipeIngredientDraft::new(milk.id, 300.0, Some(millilitre.id)),
                RecipeIngredientDraft::new(flour.id, 100.0, Some(gram.id)),
            ],
        )
        .unwrap();
    pancakes
}

#[test]
fn catalog_detail_and_open_touch_access_time() {
    let conn = open_db_in_memory().unwrap();
    let catalog = catalog(&conn);

    let onion = catalog
        .create_ingredient("onion", Some("  ".to_string()))
        .unwrap();
    assert_eq!(onion.description, None);
    catalog.add_variant(onion.id, "red").unwrap();
    catalog.add_image(onion.id, "file:///onion.png").unwrap();

    let detail = catalog.ingredient_detail(onion.id).unwrap();
    assert_eq!(detail.variants.len(), 1);
    assert_eq!(detail.images.len(), 1);
    assert_eq!(detail.ingredient.date_accessed, None);

    let opened = catalog.open_ingredient(onion.id).unwrap();
    assert!(opened.ingredient.date_accessed.is_some());

    assert!(matches!(
        catalog.ingredient_detail(uuid::Uuid::new_v4()),
        Err(ServiceError::NotFound {
            kind: EntityKind::Ingredient,
            ..
        })
    ));
}

#[test]
fn recipe_detail_resolves_names_and_measures() {
    let conn = open_db_in_memory().unwrap();
    let pancakes = seed_pancakes(&conn);
    let recipes = recipes(&conn);

    recipes
        .set_instructions(
            pancakes.id,
            &[SectionDraft {
                name: None,
                steps: vec!["Mix".to_string(), "Fry".to_string()],
            }],
        )
        .unwrap();
    recipes
        .set_tags(pancakes.id, &["Breakfast".to_string()])
        .unwrap();

    let detail = recipes.recipe_detail(pancakes.id).unwrap();
    let lines = detail
        .ingredients
        .iter()
        .map(|line| {
            (
                line.ingredient_name.as_str(),
                line.measure.as_ref().map(|m| m.abbreviation.as_str()),
            )
        })
        .collect::<Vec<_>>();
    assert_eq!(
        lines,
        vec![
            ("flour", Some("g")),
            ("egg", None),
            ("milk", Some("ml")),
            ("flour", Some("g")),
        ]
    );
    assert_eq!(detail.sections[0].steps.len(), 2);
    assert_eq!(detail.tags, vec!["breakfast"]);
    assert_eq!(detail.recipe.date_accessed, None);

    let opened = recipes.open_recipe(pancakes.id).unwrap();
    assert!(opened.recipe.date_accessed.is_some());
}

#[test]
fn scaling_requires_base_servings() {
    let conn = open_db_in_memory().unwrap();
    let pancakes = seed_pancakes(&conn);
    let recipes = recipes(&conn);

    let doubled = recipes.scale_ingredients(pancakes.id, 8).unwrap();
    let quantities = doubled
        .iter()
        .map(|line| line.line.quantity)
        .collect::<Vec<_>>();
    assert_eq!(quantities, vec![400.0, 4.0, 600.0, 200.0]);

    assert!(matches!(
        recipes.scale_ingredients(pancakes.id, 0),
        Err(ServiceError::InvalidInput(_))
    ));

    let bare = recipes.create_recipe(&Recipe::new("Toast")).unwrap();
    assert!(matches!(
        recipes.scale_ingredients(bare.id, 2),
        Err(ServiceError::InvalidInput(_))
    ));
}

#[test]
fn cooking_view_converts_where_a_rate_exists() {
    let conn = open_db_in_memory().unwrap();
    let pancakes = seed_pancakes(&conn);
    let recipes = recipes(&conn);
    let kilogram = catalog(&conn)
        .list_measures()
        .unwrap()
        .into_iter()
        .find(|m| m.abbreviation == "kg")
        .unwrap();

    let view = recipes
        .cooking_view(pancakes.id, Some(2), Some(kilogram.id))
        .unwrap();
    assert_eq!(view.len(), 4);

    assert!(view[0].converted);
    assert!((view[0].quantity - 0.1).abs() < 1e-9);
    assert_eq!(view[0].measure.as_ref().unwrap().id, kilogram.id);

    assert!(!view[1].converted);
    assert_eq!(view[1].quantity, 1.0);
    assert!(view[1].measure.is_none());

    assert!(!view[2].converted);
    assert_eq!(view[2].quantity, 150.0);
    assert_eq!(view[2].measure.as_ref().unwrap().abbreviation, "ml");

    let plain = recipes.cooking_view(pancakes.id, None, None).unwrap();
    assert_eq!(plain[0].quantity, 200.0);
    assert!(plain.iter().all(|line| !line.converted));

    assert!(matches!(
        recipes.cooking_view(pancakes.id, None, Some(uuid::Uuid::new_v4())),
        Err(ServiceError::NotFound {
            kind: EntityKind::Measure,
            ..
        })
    ));
}

#[test]
fn shopping_text_items_resolve_units_and_ingredients() {
    let conn = open_db_in_memory().unwrap();
    seed_pancakes(&conn);
    let shopping = shopping(&conn);
    let list = shopping.create_list("Weekly").unwrap();

    let flour = shopping
        .add_item_from_text(list.id, "1,5 Kilogram flour", ParseMode::Strict)
        .unwrap();
    assert_eq!(flour.quantity, Some(1.5));
    assert_eq!(flour.unit.as_deref(), Some("kg"));
    assert!(flour.ingredient_id.is_some());

    let soap = shopping
        .add_item_from_text(list.id, "soap 2 bars", ParseMode::Strict)
        .unwrap();
    assert_eq!(soap.unit.as_deref(), Some("bars"));
    assert_eq!(soap.ingredient_id, None);

    assert!(matches!(
        shopping.add_item_from_text(list.id, "bananas", ParseMode::Strict),
        Err(ServiceError::Parse(QuantityParseError::NoMatch(_)))
    ));
    let bananas = shopping
        .add_item_from_text(list.id, "  bananas  ", ParseMode::Lenient)
        .unwrap();
    assert_eq!(bananas.name, "bananas");
    assert_eq!(bananas.quantity, None);

    assert!(matches!(
        shopping.add_item_from_text(list.id, "   ", ParseMode::Lenient),
        Err(ServiceError::Parse(QuantityParseError::Empty))
    ));

    let detail = shopping.list_detail(list.id).unwrap();
    assert_eq!(detail.items.len(), 3);
}

#[test]
fn adding_recipe_to_list_merges_matching_items() {
    let conn = open_db_in_memory().unwrap();
    let pancakes = seed_pancakes(&conn);
    let shopping = shopping(&conn);
    let list = shopping.create_list("Brunch").unwrap();

    shopping
        .add_item_from_text(list.id, "50 g flour", ParseMode::Strict)
        .unwrap();

    let report = shopping.add_recipe_to_list(list.id, pancakes.id).unwrap();
    assert_eq!(report.merged, 1);
    assert_eq!(report.added, 2);

    let items = shopping.list_detail(list.id).unwrap().items;
    let flour = items.iter().find(|item| item.name == "flour").unwrap();
    assert_eq!(flour.quantity, Some(350.0));
    assert_eq!(flour.unit.as_deref(), Some("g"));
    let egg = items.iter().find(|item| item.name == "egg").unwrap();
    assert_eq!(egg.quantity, Some(2.0));
    assert_eq!(egg.unit, None);

    shopping.set_item_checked(flour.id, true).unwrap();
    let again = shopping.add_recipe_to_list(list.id, pancakes.id).unwrap();
    assert_eq!(again.merged, 2);
    assert_eq!(again.added, 1);
    assert_eq!(shopping.clear_checked(list.id).unwrap(), 1);
    assert_eq!(shopping.list_detail(list.id).unwrap().items.len(), 3);

    assert!(matches!(
        shopping.add_recipe_to_list(uuid::Uuid::new_v4(), pancakes.id),
        Err(ServiceError::NotFound {
            kind: EntityKind::ShoppingList,
            ..
        })
    ));
}

#[test]
fn logging_a_recipe_meal_copies_lines_and_counts() {
    let conn = open_db_in_memory().unwrap();
    let pancakes = seed_pancakes(&conn);
    let meals = MealService::new(
        SqliteMealRepository::try_new(&conn).unwrap(),
        SqliteRecipeRepository::try_new(&conn).unwrap(),
        SqliteIngredientRepository::try_new(&conn).unwrap(),
    );

    let detail = meals
        .log_recipe_meal(pancakes.id, 1_000, Some(" sunday ".to_string()))
        .unwrap();
    assert_eq!(detail.entry.name, "Pancakes");
    assert_eq!(detail.entry.note.as_deref(), Some("sunday"));
    assert_eq!(detail.entry.recipe_id, Some(pancakes.id));
    assert_eq!(detail.ingredients.len(), 4);
    assert_eq!(detail.ingredients[0].ingredient_name, "flour");

    let recipes = recipes(&conn);
    assert_eq!(
        recipes.recipe_detail(pancakes.id).unwrap().recipe.times_made,
        1
    );

    let egg_id = detail.ingredients[1].ingredient.ingredient_id;
    let snack = meals
        .log_meal(
            &MealEntry::new("Boiled egg", 2_000),
            &["Snack".to_string()],
            &[MealEntryIngredient {
                ingredient_id: egg_id,
                quantity: None,
                measure_id: None,
            }],
        )
        .unwrap();
    assert_eq!(snack.tags, vec!["snack"]);

    let range = meals.list_between(1_000, 2_000).unwrap();
    assert_eq!(range.len(), 1);
    assert!(matches!(
        meals.list_between(2_000, 1_000),
        Err(ServiceError::InvalidInput(_))
    ));
}

#[test]
fn home_snapshot_sections() {
    let conn = open_db_in_memory().unwrap();
    let pancakes = seed_pancakes(&conn);
    let recipes = recipes(&conn);
    recipes.create_recipe(&Recipe::new("Untouched")).unwrap();
    recipes.open_recipe(pancakes.id).unwrap();
    recipes.mark_made(pancakes.id).unwrap();

    let meals = MealService::new(
        SqliteMealRepository::try_new(&conn).unwrap(),
        SqliteRecipeRepository::try_new(&conn).unwrap(),
        SqliteIngredientRepository::try_new(&conn).unwrap(),
    );
    let now = 10_000_000;
    meals
        .log_meal(&MealEntry::new("Tomorrow", now + 1), &[], &[])
        .unwrap();
    meals
        .log_meal(&MealEntry::new("Far away", now + UPCOMING_WINDOW_MS), &[], &[])
        .unwrap();
    meals
        .log_meal(&MealEntry::new("Yesterday", now - 1), &[], &[])
        .unwrap();

    let shopping = shopping(&conn);
    let open = shopping.create_list("Open").unwrap();
    shopping
        .add_item_from_text(open.id, "milk", ParseMode::Lenient)
        .unwrap();
    shopping.create_list("Empty").unwrap();

    let home = HomeService::new(
        SqliteRecipeRepository::try_new(&conn).unwrap(),
        SqliteMealRepository::try_new(&conn).unwrap(),
        SqliteShoppingRepository::try_new(&conn).unwrap(),
    );
    let snapshot = home.snapshot(now, 5).unwrap();
    assert_eq!(snapshot.recent_recipes.len(), 1);
    assert_eq!(snapshot.recent_recipes[0].id, pancakes.id);
    assert_eq!(snapshot.most_made_recipes.len(), 1);
    let upcoming = snapshot
        .upcoming_meals
        .iter()
        .map(|entry| entry.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(upcoming, vec!["Tomorrow"]);
    assert_eq!(snapshot.open_lists.len(), 1);
    assert_eq!(snapshot.open_lists[0].list.id, open.id);
}
