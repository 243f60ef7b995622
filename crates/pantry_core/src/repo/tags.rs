//! Tag normalization and link-table helpers shared by recipes and meal entries.
//!
//! # Invariants
//! - Tag names are trimmed and lowercased before persistence.
//! - Replacing a tag set deletes every old link before inserting new ones,
//!   inside the caller's transaction.

use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Transaction};
use std::collections::BTreeSet;

/// Owner tables that carry tag links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagOwner {
    Recipe,
    MealEntry,
}

impl TagOwner {
    fn link_table(self) -> &'static str {
        match self {
            Self::Recipe => "recipe_tags",
            Self::MealEntry => "meal_entry_tags",
        }
    }

    fn owner_column(self) -> &'static str {
        match self {
            Self::Recipe => "recipe_uuid",
            Self::MealEntry => "meal_entry_uuid",
        }
    }
}

/// Normalizes one tag value; blank input yields `None`.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes and deduplicates tags, rejecting blank entries.
pub fn normalize_tags(tags: &[String]) -> RepoResult<Vec<String>> {
    let mut unique = BTreeSet::new();
    for tag in tags {
        match normalize_tag(tag) {
            Some(value) => {
                unique.insert(value);
            }
            None => return Err(RepoError::InvalidTag(tag.clone())),
        }
    }
    Ok(unique.into_iter().collect())
}

/// Returns every known tag sorted by name.
pub(crate) fn list_all_tags(conn: &Connection) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM tags ORDER BY name COLLATE NOCASE ASC;")?;
    let mut rows = stmt.query([])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        tags.push(value.to_lowercase());
    }
    Ok(tags)
}

pub(crate) fn load_tags(conn: &Connection, owner: TagOwner, owner_uuid: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT t.name
         FROM {link} l
         INNER JOIN tags t ON t.id = l.tag_id
         WHERE l.{column} = ?1
         ORDER BY t.name COLLATE NOCASE ASC;",
        link = owner.link_table(),
        column = owner.owner_column(),
    ))?;
    let mut rows = stmt.query([owner_uuid])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        tags.push(value.to_lowercase());
    }
    Ok(tags)
}

/// Replaces the full tag set of one owner. `tags` must already be normalized.
pub(crate) fn replace_tags(
    tx: &Transaction<'_>,
    owner: TagOwner,
    owner_uuid: &str,
    tags: &[String],
) -> RepoResult<()> {
    tx.execute(
        &format!(
            "DELETE FROM {link} WHERE {column} = ?1;",
            link = owner.link_table(),
            column = owner.owner_column(),
        ),
        [owner_uuid],
    )?;

    for tag in tags {
        tx.execute("INSERT OR IGNORE INTO tags (name) VALUES (?1);", [tag.as_str()])?;
        tx.execute(
            &format!(
                "INSERT INTO {link} ({column}, tag_id)
                 SELECT ?1, id
                 FROM tags
                 WHERE name = ?2 COLLATE NOCASE;",
                link = owner.link_table(),
                column = owner.owner_column(),
            ),
            params![owner_uuid, tag.as_str()],
        )?;
    }

    Ok(())
}
