use pantry_core::db::migrations::latest_version;
use pantry_core::db::{open_db, open_db_in_memory, open_db_with, DbError, OpenOptions};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in [
        "measures",
        "measure_conversions",
        "ingredients",
        "ingredient_variants",
        "recipes",
        "recipe_ingredients",
        "instruction_sections",
        "instructions",
        "tags",
        "recipe_tags",
        "meal_entries",
        "shopping_lists",
        "shopping_list_items",
        "catalog_fts",
    ] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn connections_enforce_foreign_keys() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pantry.db");

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute(
            "INSERT INTO measures (uuid, name, abbreviation) VALUES ('m1', 'gram', 'g');",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let count: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM measures;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn open_creates_missing_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app").join("data").join("pantry.db");

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    assert!(path.exists());
}

#[test]
fn parent_that_is_a_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let err = open_db(blocker.join("pantry.db")).unwrap_err();
    assert!(matches!(err, DbError::Io { .. }), "unexpected error: {err}");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn destructive_fallback_rebuilds_newer_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("downgrade.db");

    let conn = open_db(&path).unwrap();
    conn.execute(
        "INSERT INTO ingredients (uuid, name) VALUES ('i1', 'Leek');",
        [],
    )
    .unwrap();
    conn.execute_batch(
        "CREATE TABLE from_the_future (id INTEGER PRIMARY KEY);
         PRAGMA user_version = 999;",
    )
    .unwrap();
    drop(conn);

    let conn = open_db_with(
        &path,
        OpenOptions {
            destructive_fallback: true,
        },
    )
    .unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    let leftover: i64 = conn
        .query_row("SELECT COUNT(*) FROM ingredients;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(leftover, 0);
    let future_table: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE name = 'from_the_future';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(future_table, 0);
    assert_table_exists(&conn, "catalog_fts");
}

#[test]
fn app_default_options_enable_fallback() {
    assert!(OpenOptions::app_default().destructive_fallback);
    assert!(!OpenOptions::default().destructive_fallback);
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
