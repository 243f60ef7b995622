use pantry_core::db::open_db_in_memory;
use pantry_core::model::ingredient::Ingredient;
use pantry_core::model::shopping::{ShoppingList, ShoppingListItem};
use pantry_core::repo::ingredient_repo::{IngredientRepository, SqliteIngredientRepository};
use pantry_core::repo::shopping_repo::{ShoppingRepository, SqliteShoppingRepository};
use pantry_core::repo::RepoError;
use uuid::Uuid;

#[test]
fn items_append_positions_and_sort_unchecked_first() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteShoppingRepository::try_new(&conn).unwrap();

    let list = ShoppingList::new("Weekly");
    repo.create_list(&list).unwrap();

    let mut added = Vec::new();
    for name in ["milk", "eggs", "bread"] {
        added.push(repo.add_item(&ShoppingListItem::new(list.id, name)).unwrap());
    }
    let positions = added.iter().map(|item| item.position).collect::<Vec<_>>();
    assert_eq!(positions, vec![0, 1, 2]);

    repo.set_item_checked(added[0].id, true).unwrap();
    let names = repo
        .list_items(list.id)
        .unwrap()
        .into_iter()
        .map(|item| (item.name, item.checked))
        .collect::<Vec<_>>();
    assert_eq!(
        names,
        vec![
            ("eggs".to_string(), false),
            ("bread".to_string(), false),
            ("milk".to_string(), true),
        ]
    );

    repo.delete_item(added[1].id).unwrap();
    let next = repo
        .add_item(&ShoppingListItem::new(list.id, "butter"))
        .unwrap();
    assert_eq!(next.position, 3);
}

#[test]
fn summaries_count_items() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteShoppingRepository::try_new(&conn).unwrap();

    let empty = ShoppingList::new("Empty");
    let party = ShoppingList::new("Party");
    repo.create_list(&empty).unwrap();
    repo.create_list(&party).unwrap();
    let chips = repo
        .add_item(&ShoppingListItem::new(party.id, "chips"))
        .unwrap();
    repo.add_item(&ShoppingListItem::new(party.id, "salsa"))
        .unwrap();
    repo.set_item_checked(chips.id, true).unwrap();

    let summaries = repo.list_lists().unwrap();
    assert_eq!(summaries.len(), 2);
    let party_summary = summaries
        .iter()
        .find(|summary| summary.list.id == party.id)
        .unwrap();
    assert_eq!(party_summary.item_count, 2);
    assert_eq!(party_summary.unchecked_count, 1);
    let empty_summary = summaries
        .iter()
        .find(|summary| summary.list.id == empty.id)
        .unwrap();
    assert_eq!(empty_summary.item_count, 0);
    assert_eq!(empty_summary.unchecked_count, 0);
}

#[test]
fn checking_and_deleting_items_bump_list_updated_at() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteShoppingRepository::try_new(&conn).unwrap();

    let weekly = ShoppingList::new("Weekly");
    let party = ShoppingList::new("Party");
    repo.create_list(&weekly).unwrap();
    repo.create_list(&party).unwrap();
    let bread = repo
        .add_item(&ShoppingListItem::new(weekly.id, "bread"))
        .unwrap();
    let eggs = repo
        .add_item(&ShoppingListItem::new(weekly.id, "eggs"))
        .unwrap();

    let reset_clock = || {
        conn.execute(
            "UPDATE shopping_lists SET updated_at = CASE uuid WHEN ?1 THEN 1 ELSE 2 END;",
            [weekly.id.to_string()],
        )
        .unwrap();
    };
    let first_list = || repo.list_lists().unwrap()[0].list.id;

    reset_clock();
    assert_eq!(first_list(), party.id);
    repo.set_item_checked(bread.id, true).unwrap();
    assert_eq!(first_list(), weekly.id);

    reset_clock();
    assert_eq!(first_list(), party.id);
    repo.delete_item(eggs.id).unwrap();
    assert_eq!(first_list(), weekly.id);

    assert!(matches!(
        repo.set_item_checked(eggs.id, true),
        Err(RepoError::NotFound { .. })
    ));
}

#[test]
fn update_rename_and_clear_checked() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteShoppingRepository::try_new(&conn).unwrap();

    let list = ShoppingList::new("Groceries");
    repo.create_list(&list).unwrap();
    repo.rename_list(list.id, "  Market ").unwrap();
    assert_eq!(repo.get_list(list.id).unwrap().unwrap().name, "Market");
    assert!(matches!(
        repo.rename_list(list.id, "   "),
        Err(RepoError::Validation(_))
    ));

    let mut flour = repo
        .add_item(&ShoppingListItem::new(list.id, "flour"))
        .unwrap();
    flour.quantity = Some(2.0);
    flour.unit = Some("kg".to_string());
    flour.checked = true;
    repo.update_item(&flour).unwrap();
    assert_eq!(repo.get_item(flour.id).unwrap().unwrap(), flour);

    repo.add_item(&ShoppingListItem::new(list.id, "sugar"))
        .unwrap();
    assert_eq!(repo.clear_checked(list.id).unwrap(), 1);
    assert_eq!(repo.clear_checked(list.id).unwrap(), 0);
    assert_eq!(repo.list_items(list.id).unwrap().len(), 1);

    let mut bad = ShoppingListItem::new(list.id, "salt");
    bad.quantity = Some(0.0);
    assert!(matches!(repo.add_item(&bad), Err(RepoError::Validation(_))));
}

#[test]
fn missing_list_and_cascades() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteShoppingRepository::try_new(&conn).unwrap();
    let ingredients = SqliteIngredientRepository::try_new(&conn).unwrap();

    assert!(matches!(
        repo.add_item(&ShoppingListItem::new(Uuid::new_v4(), "ghost")),
        Err(RepoError::NotFound { .. })
    ));
    assert!(matches!(
        repo.clear_checked(Uuid::new_v4()),
        Err(RepoError::NotFound { .. })
    ));

    let tomato = Ingredient::new("tomato");
    ingredients.create_ingredient(&tomato).unwrap();
    let list = ShoppingList::new("Sauce");
    repo.create_list(&list).unwrap();
    let mut item = ShoppingListItem::new(list.id, "tomato");
    item.ingredient_id = Some(tomato.id);
    let item = repo.add_item(&item).unwrap();

    ingredients.delete_ingredient(tomato.id).unwrap();
    assert_eq!(repo.get_item(item.id).unwrap().unwrap().ingredient_id, None);

    repo.delete_list(list.id).unwrap();
    assert!(repo.get_item(item.id).unwrap().is_none());
    assert!(matches!(
        repo.delete_list(list.id),
        Err(RepoError::NotFound { .. })
    ));
}
