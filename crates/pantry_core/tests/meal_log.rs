use pantry_core::db::open_db_in_memory;
use pantry_core::model::ingredient::Ingredient;
use pantry_core::model::meal::{MealEntry, MealEntryIngredient};
use pantry_core::model::measure::Measure;
use pantry_core::model::recipe::Recipe;
use pantry_core::repo::ingredient_repo::{IngredientRepository, SqliteIngredientRepository};
use pantry_core::repo::meal_repo::{MealRepository, SqliteMealRepository};
use pantry_core::repo::measure_repo::{MeasureRepository, SqliteMeasureRepository};
use pantry_core::repo::recipe_repo::{RecipeRepository, SqliteRecipeRepository};
use pantry_core::repo::RepoError;
use uuid::Uuid;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[test]
fn entries_are_listed_in_half_open_range() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMealRepository::try_new(&conn).unwrap();

    let breakfast = MealEntry::new("Porridge", DAY_MS);
    let lunch = MealEntry::new("Soup", DAY_MS + 5 * 60 * 60 * 1000);
    let next_day = MealEntry::new("Toast", 2 * DAY_MS);
    for entry in [&lunch, &next_day, &breakfast] {
        repo.create_entry(entry).unwrap();
    }

    let day = repo.list_entries_between(DAY_MS, 2 * DAY_MS).unwrap();
    let names = day.iter().map(|e| e.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["Porridge", "Soup"]);

    assert!(repo
        .list_entries_between(2 * DAY_MS, 2 * DAY_MS)
        .unwrap()
        .is_empty());
    assert_eq!(
        repo.list_entries_between(2 * DAY_MS, 3 * DAY_MS).unwrap()[0].id,
        next_day.id
    );
}

#[test]
fn update_and_delete_entry() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMealRepository::try_new(&conn).unwrap();

    let mut entry = MealEntry::new("Pasta", 1_000);
    repo.create_entry(&entry).unwrap();
    entry.note = Some("too salty".to_string());
    entry.eaten_at = 2_000;
    repo.update_entry(&entry).unwrap();
    assert_eq!(repo.get_entry(entry.id).unwrap().unwrap(), entry);

    assert!(matches!(
        repo.create_entry(&MealEntry::new(" ", 0)),
        Err(RepoError::Validation(_))
    ));

    repo.delete_entry(entry.id).unwrap();
    assert!(repo.get_entry(entry.id).unwrap().is_none());
    assert!(matches!(
        repo.update_entry(&entry),
        Err(RepoError::NotFound { .. })
    ));
}

#[test]
fn tags_and_ingredients_are_replaced_as_sets() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMealRepository::try_new(&conn).unwrap();
    let ingredients = SqliteIngredientRepository::try_new(&conn).unwrap();
    let measures = SqliteMeasureRepository::try_new(&conn).unwrap();

    let rice = Ingredient::new("rice");
    let beans = Ingredient::new("beans");
    ingredients.create_ingredient(&rice).unwrap();
    ingredients.create_ingredient(&beans).unwrap();
    let cup = Measure::new("cup", "c");
    measures.create_measure(&cup).unwrap();

    let entry = MealEntry::new("Rice and beans", 10);
    repo.create_entry(&entry).unwrap();

    let tags = repo
        .set_entry_tags(entry.id, &["Dinner".to_string(), "vegan".to_string()])
        .unwrap();
    assert_eq!(tags, vec!["dinner", "vegan"]);
    repo.set_entry_tags(entry.id, &["leftovers".to_string()])
        .unwrap();
    assert_eq!(repo.list_entry_tags(entry.id).unwrap(), vec!["leftovers"]);

    let lines = vec![
        MealEntryIngredient {
            ingredient_id: rice.id,
            quantity: Some(1.5),
            measure_id: Some(cup.id),
        },
        MealEntryIngredient {
            ingredient_id: beans.id,
            quantity: None,
            measure_id: None,
        },
    ];
    repo.set_entry_ingredients(entry.id, &lines).unwrap();
    assert_eq!(repo.list_entry_ingredients(entry.id).unwrap(), lines);

    repo.set_entry_ingredients(entry.id, &lines[1..]).unwrap();
    assert_eq!(repo.list_entry_ingredients(entry.id).unwrap().len(), 1);

    assert!(matches!(
        repo.set_entry_tags(Uuid::new_v4(), &["x".to_string()]),
        Err(RepoError::NotFound { .. })
    ));
    assert!(matches!(
        repo.set_entry_ingredients(
            entry.id,
            &[MealEntryIngredient {
                ingredient_id: rice.id,
                quantity: Some(-1.0),
                measure_id: None,
            }],
        ),
        Err(RepoError::Validation(_))
    ));
}

#[test]
fn deleting_recipe_detaches_logged_meals() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMealRepository::try_new(&conn).unwrap();
    let recipes = SqliteRecipeRepository::try_new(&conn).unwrap();

    let recipe = Recipe::new("Lasagne");
    recipes.create_recipe(&recipe).unwrap();
    let mut entry = MealEntry::new("Lasagne", 5);
    entry.recipe_id = Some(recipe.id);
    repo.create_entry(&entry).unwrap();

    recipes.delete_recipe(recipe.id).unwrap();
    let loaded = repo.get_entry(entry.id).unwrap().unwrap();
    assert_eq!(loaded.recipe_id, None);
    assert_eq!(loaded.name, "Lasagne");
}
