//! Shopping list repository.
//!
//! # Responsibility
//! - CRUD over `shopping_lists` and their items.
//! - Keep item positions append-ordered per list.
//!
//! # Invariants
//! - New items are appended after the current last position.
//! - Item lists are ordered unchecked-first, then by position.
//! - Every item write bumps the owning list's `updated_at`.

use crate::model::shopping::{ShoppingItemId, ShoppingList, ShoppingListId, ShoppingListItem};
use crate::repo::{
    begin_immediate, bool_column, bool_to_int, ensure_connection_ready, optional_uuid_column,
    u32_column, uuid_column, uuid_text, EntityKind, RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};

const REQUIRED_TABLES: &[&str] = &["shopping_lists", "shopping_list_items"];

const ITEM_SELECT_SQL: &str = "SELECT
    uuid,
    list_uuid,
    name,
    quantity,
    unit,
    ingredient_uuid,
    checked,
    position
FROM shopping_list_items";

/// Shopping list header with item counters for overview screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListSummary {
    pub list: ShoppingList,
    pub item_count: u32,
    pub unchecked_count: u32,
}

/// Repository interface for shopping list operations.
pub trait ShoppingRepository {
    fn create_list(&self, list: &ShoppingList) -> RepoResult<ShoppingListId>;
    fn rename_list(&self, id: ShoppingListId, name: &str) -> RepoResult<()>;
    fn get_list(&self, id: ShoppingListId) -> RepoResult<Option<ShoppingList>>;
    /// Lists all lists, most recently updated first.
    fn list_lists(&self) -> RepoResult<Vec<ShoppingListSummary>>;
    fn delete_list(&self, id: ShoppingListId) -> RepoResult<()>;
    /// Appends an item; its `position` is assigned by storage and returned.
    fn add_item(&self, item: &ShoppingListItem) -> RepoResult<ShoppingListItem>;
    fn update_item(&self, item: &ShoppingListItem) -> RepoResult<()>;
    fn get_item(&self, id: ShoppingItemId) -> RepoResult<Option<ShoppingListItem>>;
    fn set_item_checked(&self, id: ShoppingItemId, checked: bool) -> RepoResult<()>;
    fn list_items(&self, list_id: ShoppingListId) -> RepoResult<Vec<ShoppingListItem>>;
    fn delete_item(&self, id: ShoppingItemId) -> RepoResult<()>;
    /// Removes checked items and returns how many were deleted.
    fn clear_checked(&self, list_id: ShoppingListId) -> RepoResult<u32>;
}

/// SQLite-backed shopping list repository.
#[derive(Clone, Copy)]
pub struct SqliteShoppingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteShoppingRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl ShoppingRepository for SqliteShoppingRepository<'_> {
    fn create_list(&self, list: &ShoppingList) -> RepoResult<ShoppingListId> {
        list.validate()?;
        self.conn.execute(
            "INSERT INTO shopping_lists (uuid, name) VALUES (?1, ?2);",
            params![list.id.to_string(), list.name.as_str()],
        )?;
        Ok(list.id)
    }

    fn rename_list(&self, id: ShoppingListId, name: &str) -> RepoResult<()> {
        let renamed = ShoppingList {
            id,
            name: name.trim().to_string(),
        };
        renamed.validate()?;
        let changed = self.conn.execute(
            "UPDATE shopping_lists
             SET name = ?2, updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![id.to_string(), renamed.name.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::ShoppingList, id));
        }
        Ok(())
    }

    fn get_list(&self, id: ShoppingListId) -> RepoResult<Option<ShoppingList>> {
        let mut stmt = self
            .conn
            .prepare("SELECT uuid, name FROM shopping_lists WHERE uuid = ?1;")?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_list_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_lists(&self) -> RepoResult<Vec<ShoppingListSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                l.uuid AS uuid,
                l.name AS name,
                COUNT(i.uuid) AS item_count,
                COALESCE(SUM(CASE WHEN i.checked = 0 THEN 1 ELSE 0 END), 0) AS unchecked_count
             FROM shopping_lists l
             LEFT JOIN shopping_list_items i ON i.list_uuid = l.uuid
             GROUP BY l.uuid
             ORDER BY l.updated_at DESC, l.uuid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut lists = Vec::new();
        while let Some(row) = rows.next()? {
            lists.push(ShoppingListSummary {
                list: parse_list_row(row)?,
                item_count: u32_column(row, "item_count")?,
                unchecked_count: u32_column(row, "unchecked_count")?,
            });
        }
        Ok(lists)
    }

    fn delete_list(&self, id: ShoppingListId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM shopping_lists WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::ShoppingList, id));
        }
        Ok(())
    }

    fn add_item(&self, item: &ShoppingListItem) -> RepoResult<ShoppingListItem> {
        item.validate()?;
        let list_uuid = item.list_id.to_string();
        let tx = begin_immediate(self.conn)?;
        if !list_exists(&tx, &list_uuid)? {
            return Err(RepoError::not_found(EntityKind::ShoppingList, item.list_id));
        }

        let next_position: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0)
             FROM shopping_list_items
             WHERE list_uuid = ?1;",
            [list_uuid.as_str()],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO shopping_list_items (
                uuid,
                list_uuid,
                name,
                quantity,
                unit,
                ingredient_uuid,
                checked,
                position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                item.id.to_string(),
                list_uuid.as_str(),
                item.name.as_str(),
                item.quantity,
                item.unit.as_deref(),
                uuid_text(item.ingredient_id),
                bool_to_int(item.checked),
                next_position,
            ],
        )?;
        touch_list(&tx, &list_uuid)?;
        tx.commit()?;

        let position = u32::try_from(next_position).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid value `{next_position}` in shopping_list_items.position"
            ))
        })?;
        Ok(ShoppingListItem {
            position,
            ..item.clone()
        })
    }

    fn update_item(&self, item: &ShoppingListItem) -> RepoResult<()> {
        item.validate()?;
        let tx = begin_immediate(self.conn)?;
        let changed = tx.execute(
            "UPDATE shopping_list_items
             SET name = ?2, quantity = ?3, unit = ?4, ingredient_uuid = ?5, checked = ?6
             WHERE uuid = ?1;",
            params![
                item.id.to_string(),
                item.name.as_str(),
                item.quantity,
                item.unit.as_deref(),
                uuid_text(item.ingredient_id),
                bool_to_int(item.checked),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::ShoppingListItem, item.id));
        }
        touch_list(&tx, &item.list_id.to_string())?;
        tx.commit()?;
        Ok(())
    }

    fn get_item(&self, id: ShoppingItemId) -> RepoResult<Option<ShoppingListItem>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ITEM_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_item_row(row)?)),
            None => Ok(None),
        }
    }

    fn set_item_checked(&self, id: ShoppingItemId, checked: bool) -> RepoResult<()> {
        let tx = begin_immediate(self.conn)?;
        let Some(list_uuid) = item_list_uuid(&tx, id)? else {
            return Err(RepoError::not_found(EntityKind::ShoppingListItem, id));
        };
        tx.execute(
            "UPDATE shopping_list_items SET checked = ?2 WHERE uuid = ?1;",
            params![id.to_string(), bool_to_int(checked)],
        )?;
        touch_list(&tx, &list_uuid)?;
        tx.commit()?;
        Ok(())
    }

    fn list_items(&self, list_id: ShoppingListId) -> RepoResult<Vec<ShoppingListItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ITEM_SELECT_SQL}
             WHERE list_uuid = ?1
             ORDER BY checked ASC, position ASC;"
        ))?;
        let mut rows = stmt.query([list_id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }
        Ok(items)
    }

    fn delete_item(&self, id: ShoppingItemId) -> RepoResult<()> {
        let tx = begin_immediate(self.conn)?;
        let Some(list_uuid) = item_list_uuid(&tx, id)? else {
            return Err(RepoError::not_found(EntityKind::ShoppingListItem, id));
        };
        tx.execute(
            "DELETE FROM shopping_list_items WHERE uuid = ?1;",
            [id.to_string()],
        )?;
        touch_list(&tx, &list_uuid)?;
        tx.commit()?;
        Ok(())
    }

    fn clear_checked(&self, list_id: ShoppingListId) -> RepoResult<u32> {
        let list_uuid = list_id.to_string();
        let tx = begin_immediate(self.conn)?;
        if !list_exists(&tx, &list_uuid)? {
            return Err(RepoError::not_found(EntityKind::ShoppingList, list_id));
        }
        let removed = tx.execute(
            "DELETE FROM shopping_list_items WHERE list_uuid = ?1 AND checked = 1;",
            [list_uuid.as_str()],
        )?;
        touch_list(&tx, &list_uuid)?;
        tx.commit()?;
        Ok(u32::try_from(removed).unwrap_or(u32::MAX))
    }
}

fn list_exists(conn: &Connection, list_uuid: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM shopping_lists WHERE uuid = ?1);",
        [list_uuid],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn item_list_uuid(conn: &Connection, id: ShoppingItemId) -> RepoResult<Option<String>> {
    let mut stmt = conn.prepare("SELECT list_uuid FROM shopping_list_items WHERE uuid = ?1;")?;
    let mut rows = stmt.query([id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(row.get(0)?)),
        None => Ok(None),
    }
}

fn touch_list(conn: &Connection, list_uuid: &str) -> RepoResult<()> {
    conn.execute(
        "UPDATE shopping_lists
         SET updated_at = (strftime('%s', 'now') * 1000)
         WHERE uuid = ?1;",
        [list_uuid],
    )?;
    Ok(())
}

fn parse_list_row(row: &Row<'_>) -> RepoResult<ShoppingList> {
    let list = ShoppingList {
        id: uuid_column(row, "uuid")?,
        name: row.get("name")?,
    };
    list.validate()?;
    Ok(list)
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<ShoppingListItem> {
    let item = ShoppingListItem {
        id: uuid_column(row, "uuid")?,
        list_id: uuid_column(row, "list_uuid")?,
        name: row.get("name")?,
        quantity: row.get("quantity")?,
        unit: row.get("unit")?,
        ingredient_id: optional_uuid_column(row, "ingredient_uuid")?,
        checked: bool_column(row, "checked")?,
        position: u32_column(row, "position")?,
    };
    item.validate()?;
    Ok(item)
}
