use pantry_core::conversion::{convert, convert_by_label, round_trip_factor, ConversionError};
use pantry_core::db::open_db_in_memory;
use pantry_core::model::ingredient::Ingredient;
use pantry_core::model::measure::{Measure, MeasureConversion};
use pantry_core::model::recipe::{Recipe, RecipeIngredientDraft};
use pantry_core::model::ValidationError;
use pantry_core::repo::ingredient_repo::{IngredientRepository, SqliteIngredientRepository};
use pantry_core::repo::measure_repo::{MeasureRepository, SqliteMeasureRepository};
use pantry_core::repo::recipe_repo::{RecipeRepository, SqliteRecipeRepository};
use pantry_core::repo::RepoError;
use rusqlite::Connection;

fn seed_units(repo: &SqliteMeasureRepository<'_>) -> (Measure, Measure, Measure) {
    let gram = Measure::new("gram", "g");
    let kilogram = Measure::new("kilogram", "kg");
    let cup = Measure::new("cup", "cup");
    for measure in [&gram, &kilogram, &cup] {
        repo.create_measure(measure).unwrap();
    }
    (gram, kilogram, cup)
}

#[test]
fn measure_crud_and_label_lookup() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMeasureRepository::try_new(&conn).unwrap();
    let (gram, _, _) = seed_units(&repo);

    assert_eq!(repo.find_measure_by_label("G").unwrap().unwrap().id, gram.id);
    assert_eq!(repo.find_measure_by_label("Gram").unwrap().unwrap().id, gram.id);
    assert_eq!(repo.find_measure_by_label("g.").unwrap().unwrap().id, gram.id);
    assert!(repo.find_measure_by_label("ounce").unwrap().is_none());

    let names = repo
        .list_measures()
        .unwrap()
        .into_iter()
        .map(|measure| measure.name)
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["cup", "gram", "kilogram"]);

    let duplicate = Measure::new("GRAM", "gr");
    assert!(matches!(
        repo.create_measure(&duplicate),
        Err(RepoError::Conflict(_))
    ));

    let mut renamed = gram.clone();
    renamed.name = "grams".to_string();
    repo.update_measure(&renamed).unwrap();
    assert_eq!(repo.get_measure(gram.id).unwrap().unwrap().name, "grams");
}

#[test]
fn conversion_uses_only_the_directed_rate() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMeasureRepository::try_new(&conn).unwrap();
    let (gram, kilogram, cup) = seed_units(&repo);

    repo.set_conversion(&MeasureConversion::new(kilogram.id, gram.id, 1000.0))
        .unwrap();

    assert_eq!(convert(&repo, 2.5, kilogram.id, gram.id).unwrap(), 2500.0);
    assert!(matches!(
        convert(&repo, 2500.0, gram.id, kilogram.id),
        Err(ConversionError::MissingRate { .. })
    ));
    assert!(matches!(
        convert(&repo, 1.0, gram.id, cup.id),
        Err(ConversionError::MissingRate { .. })
    ));
    assert_eq!(convert(&repo, 7.0, cup.id, cup.id).unwrap(), 7.0);
    assert!(matches!(
        convert(&repo, f64::NAN, kilogram.id, gram.id),
        Err(ConversionError::InvalidAmount(_))
    ));
}

#[test]
fn conversion_pair_stores_reciprocal_and_round_trips() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMeasureRepository::try_new(&conn).unwrap();
    let (gram, kilogram, cup) = seed_units(&repo);

    repo.set_conversion_pair(&MeasureConversion::new(kilogram.id, gram.id, 1000.0))
        .unwrap();

    let back = repo.get_conversion(gram.id, kilogram.id).unwrap().unwrap();
    assert!((back.rate - 0.001).abs() < 1e-12);
    let factor = round_trip_factor(&repo, gram.id, kilogram.id)
        .unwrap()
        .unwrap();
    assert!((factor - 1.0).abs() < 1e-9);
    assert_eq!(round_trip_factor(&repo, gram.id, cup.id).unwrap(), None);

    let (amount, target) = convert_by_label(&repo, 750.0, "g", "KG").unwrap();
    assert!((amount - 0.75).abs() < 1e-12);
    assert_eq!(target.id, kilogram.id);
    assert!(matches!(
        convert_by_label(&repo, 1.0, "g", "pinch"),
        Err(ConversionError::UnknownMeasure(label)) if label == "pinch"
    ));

    assert_eq!(repo.list_conversions(Some(gram.id)).unwrap().len(), 1);
    assert_eq!(repo.list_conversions(None).unwrap().len(), 2);
}

#[test]
fn conversion_upsert_replaces_rate_and_rejects_invalid_rows() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMeasureRepository::try_new(&conn).unwrap();
    let (gram, kilogram, _) = seed_units(&repo);

    repo.set_conversion(&MeasureConversion::new(kilogram.id, gram.id, 100.0))
        .unwrap();
    repo.set_conversion(&MeasureConversion::new(kilogram.id, gram.id, 1000.0))
        .unwrap();
    assert_eq!(
        repo.get_conversion(kilogram.id, gram.id).unwrap().unwrap().rate,
        1000.0
    );

    assert!(matches!(
        repo.set_conversion(&MeasureConversion::new(gram.id, gram.id, 1.0)),
        Err(RepoError::Validation(ValidationError::SelfConversion))
    ));
    assert!(matches!(
        repo.set_conversion(&MeasureConversion::new(gram.id, kilogram.id, 0.0)),
        Err(RepoError::Validation(ValidationError::NotPositive { .. }))
    ));
    assert!(matches!(
        repo.set_conversion(&MeasureConversion::new(gram.id, uuid::Uuid::new_v4(), 2.0)),
        Err(RepoError::NotFound { .. })
    ));

    repo.delete_conversion(kilogram.id, gram.id).unwrap();
    assert!(repo.get_conversion(kilogram.id, gram.id).unwrap().is_none());
    assert!(matches!(
        repo.delete_conversion(kilogram.id, gram.id),
        Err(RepoError::NotFound { .. })
    ));
}

#[test]
fn conversion_pair_rejects_rate_whose_reciprocal_is_not_finite() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMeasureRepository::try_new(&conn).unwrap();
    let (gram, kilogram, _) = seed_units(&repo);

    assert!(matches!(
        repo.set_conversion_pair(&MeasureConversion::new(gram.id, kilogram.id, 1e-310)),
        Err(RepoError::Validation(ValidationError::NotPositive { .. }))
    ));
    assert!(repo.get_conversion(gram.id, kilogram.id).unwrap().is_none());
    assert!(repo.get_conversion(kilogram.id, gram.id).unwrap().is_none());
    assert!(repo.list_conversions(None).unwrap().is_empty());
}

#[test]
fn deleting_measure_cascades_rates_but_is_blocked_by_recipe_lines() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMeasureRepository::try_new(&conn).unwrap();
    let (gram, kilogram, cup) = seed_units(&repo);
    repo.set_conversion_pair(&MeasureConversion::new(kilogram.id, gram.id, 1000.0))
        .unwrap();

    repo.delete_measure(kilogram.id).unwrap();
    assert!(repo.list_conversions(None).unwrap().is_empty());

    use_measure_in_recipe(&conn, cup.id);
    assert!(matches!(
        repo.delete_measure(cup.id),
        Err(RepoError::Conflict(_))
    ));
}

#[test]
fn repository_requires_migrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    assert!(matches!(
        SqliteMeasureRepository::try_new(&conn),
        Err(RepoError::UninitializedConnection { .. })
    ));
}

fn use_measure_in_recipe(conn: &Connection, measure_id: uuid::Uuid) {
    let ingredients = SqliteIngredientRepository::try_new(conn).unwrap();
    let recipes = SqliteRecipeRepository::try_new(conn).unwrap();
    let flour = Ingredient::new("flour");
    ingredients.create_ingredient(&flour).unwrap();
    let recipe = Recipe::new("Bread");
    recipes.create_recipe(&recipe).unwrap();
    recipes
        .replace_ingredients(
            recipe.id,
            &[RecipeIngredientDraft::new(flour.id, 2.0, Some(measure_id))],
        )
        .unwrap();
}
