use pantry_core::db::open_db_in_memory;
use pantry_core::model::ingredient::Ingredient;
use pantry_core::model::recipe::Recipe;
use pantry_core::repo::ingredient_repo::{IngredientRepository, SqliteIngredientRepository};
use pantry_core::repo::recipe_repo::{RecipeRepository, SqliteRecipeRepository};
use pantry_core::{search_all, SearchError, SearchKind, SearchQuery};
use rusqlite::Connection;

fn seed(conn: &Connection) -> (Recipe, Ingredient) {
    let recipes = SqliteRecipeRepository::try_new(conn).unwrap();
    let ingredients = SqliteIngredientRepository::try_new(conn).unwrap();

    let mut soup = Recipe::new("Tomato soup");
    soup.description = Some("Roasted tomatoes blended with basil".to_string());
    recipes.create_recipe(&soup).unwrap();

    let mut tomato = Ingredient::new("Tomato");
    tomato.description = Some("Ripe red fruit".to_string());
    ingredients.create_ingredient(&tomato).unwrap();

    recipes.create_recipe(&Recipe::new("Pancakes")).unwrap();
    (soup, tomato)
}

#[test]
fn prefix_search_spans_recipes_and_ingredients() {
    let conn = open_db_in_memory().unwrap();
    let (soup, tomato) = seed(&conn);

    let hits = search_all(&conn, &SearchQuery::new("tom")).unwrap();
    let ids = hits.iter().map(|hit| hit.id).collect::<Vec<_>>();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&soup.id));
    assert!(ids.contains(&tomato.id));

    let recipes_only = search_all(
        &conn,
        &SearchQuery {
            kind: Some(SearchKind::Recipe),
            ..SearchQuery::new("tom")
        },
    )
    .unwrap();
    assert_eq!(recipes_only.len(), 1);
    assert_eq!(recipes_only[0].kind, SearchKind::Recipe);
    assert_eq!(recipes_only[0].name, "Tomato soup");
}

#[test]
fn description_terms_match_and_snippet_marks_them() {
    let conn = open_db_in_memory().unwrap();
    let (soup, _) = seed(&conn);

    let hits = search_all(&conn, &SearchQuery::new("basil")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, soup.id);
    assert!(hits[0].snippet.contains("[basil]"));

    let both_terms = search_all(&conn, &SearchQuery::new("tomato pancake")).unwrap();
    assert!(both_terms.is_empty());
}

#[test]
fn index_follows_updates_and_deletes() {
    let conn = open_db_in_memory().unwrap();
    let recipes = SqliteRecipeRepository::try_new(&conn).unwrap();
    let (mut soup, tomato) = seed(&conn);

    soup.name = "Gazpacho".to_string();
    soup.description = None;
    recipes.update_recipe(&soup).unwrap();
    assert!(search_all(&conn, &SearchQuery::new("basil"))
        .unwrap()
        .is_empty());
    assert_eq!(
        search_all(&conn, &SearchQuery::new("gazp")).unwrap()[0].id,
        soup.id
    );

    recipes.delete_recipe(soup.id).unwrap();
    let hits = search_all(&conn, &SearchQuery::new("gazpacho")).unwrap();
    assert!(hits.is_empty());

    let ingredients = SqliteIngredientRepository::try_new(&conn).unwrap();
    ingredients.delete_ingredient(tomato.id).unwrap();
    assert!(search_all(&conn, &SearchQuery::new("tomato"))
        .unwrap()
        .is_empty());
}

#[test]
fn blank_query_zero_limit_and_special_characters() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);

    assert!(search_all(&conn, &SearchQuery::new("   ")).unwrap().is_empty());
    assert!(search_all(
        &conn,
        &SearchQuery {
            limit: 0,
            ..SearchQuery::new("tomato")
        }
    )
    .unwrap()
    .is_empty());

    let quoted = search_all(&conn, &SearchQuery::new("tomato\" OR")).unwrap();
    assert!(quoted.is_empty());
}

#[test]
fn raw_syntax_errors_surface_as_invalid_query() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);

    let result = search_all(
        &conn,
        &SearchQuery {
            raw_fts_syntax: true,
            ..SearchQuery::new("tomato AND (")
        },
    );
    assert!(matches!(result, Err(SearchError::InvalidQuery { .. })));

    let raw_or = search_all(
        &conn,
        &SearchQuery {
            raw_fts_syntax: true,
            ..SearchQuery::new("pancakes OR basil")
        },
    )
    .unwrap();
    assert_eq!(raw_or.len(), 2);
}

#[test]
fn limit_caps_results_with_stable_order() {
    let conn = open_db_in_memory().unwrap();
    let ingredients = SqliteIngredientRepository::try_new(&conn).unwrap();
    for name in ["pepper black", "pepper white", "pepper pink"] {
        ingredients.create_ingredient(&Ingredient::new(name)).unwrap();
    }

    let first = search_all(
        &conn,
        &SearchQuery {
            limit: 2,
            ..SearchQuery::new("pepper")
        },
    )
    .unwrap();
    let again = search_all(
        &conn,
        &SearchQuery {
            limit: 2,
            ..SearchQuery::new("pepper")
        },
    )
    .unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first, again);
}
