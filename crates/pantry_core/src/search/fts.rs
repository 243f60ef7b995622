//! Catalog keyword search backed by the `catalog_fts` FTS5 table.
//!
//! Recipes and ingredients share one index (`kind`, `item_uuid`, `name`,
//! `body`) that triggers keep current, so a deleted row can never be hit.
//! Hits are ordered by bm25 rank, then name, then id.

use crate::db::DbError;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

const DEFAULT_LIMIT: u32 = 20;
const SNIPPET_TOKENS: u32 = 10;

pub type SearchResult<T> = Result<T, SearchError>;

#[derive(Debug)]
pub enum SearchError {
    /// Raw FTS5 expression rejected by SQLite.
    InvalidQuery { expression: String, reason: String },
    /// Kind filter that names neither recipes nor ingredients.
    UnknownKind(String),
    Db(DbError),
    /// Index row that does not decode into a hit.
    InvalidData(String),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery { expression, reason } => {
                write!(f, "invalid search expression `{expression}`: {reason}")
            }
            Self::UnknownKind(kind) => write!(f, "unknown kind `{kind}`"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid search row: {message}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Record family of a hit, stored in the `kind` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Recipe,
    Ingredient,
}

impl SearchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recipe => "recipe",
            Self::Ingredient => "ingredient",
        }
    }
}

impl FromStr for SearchKind {
    type Err = SearchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "recipe" | "recipes" => Ok(Self::Recipe),
            "ingredient" | "ingredients" => Ok(Self::Ingredient),
            _ => Err(SearchError::UnknownKind(value.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub text: String,
    pub kind: Option<SearchKind>,
    pub limit: u32,
    /// Pass `text` to FTS5 untouched instead of prefix-matching each word.
    pub raw_fts_syntax: bool,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: None,
            limit: DEFAULT_LIMIT,
            raw_fts_syntax: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub id: Uuid,
    pub kind: SearchKind,
    pub name: String,
    /// Best matching fragment with hits wrapped in `[` `]`.
    pub snippet: String,
}

/// Runs `query` against the catalog index.
///
/// Blank text or a zero limit returns no hits without touching SQLite.
pub fn search_all(conn: &Connection, query: &SearchQuery) -> SearchResult<Vec<SearchHit>> {
    if query.limit == 0 {
        return Ok(Vec::new());
    }
    let Some(expression) = match_expression(query) else {
        return Ok(Vec::new());
    };

    let mut sql = format!(
        "SELECT kind, item_uuid, name,
                snippet(catalog_fts, -1, '[', ']', ' ... ', {SNIPPET_TOKENS}) AS snippet
         FROM catalog_fts
         WHERE catalog_fts MATCH ?"
    );
    let mut binds = vec![Value::Text(expression.clone())];
    if let Some(kind) = query.kind {
        sql.push_str(" AND kind = ?");
        binds.push(Value::Text(kind.as_str().to_string()));
    }
    sql.push_str(" ORDER BY bm25(catalog_fts), name COLLATE NOCASE, item_uuid LIMIT ?");
    binds.push(Value::Integer(i64::from(query.limit)));

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt
        .query(params_from_iter(binds))
        .map_err(|err| classify(err, &expression))?;
    let mut hits = Vec::new();
    while let Some(row) = rows.next().map_err(|err| classify(err, &expression))? {
        hits.push(hit_from_row(row)?);
    }
    Ok(hits)
}

fn hit_from_row(row: &Row<'_>) -> SearchResult<SearchHit> {
    let id_text: String = row.get("item_uuid")?;
    let kind_text: String = row.get("kind")?;
    Ok(SearchHit {
        id: Uuid::parse_str(&id_text)
            .map_err(|_| SearchError::InvalidData(format!("item_uuid `{id_text}`")))?,
        kind: kind_text
            .parse()
            .map_err(|_| SearchError::InvalidData(format!("kind `{kind_text}`")))?,
        name: row.get("name")?,
        snippet: row.get("snippet")?,
    })
}

/// Every word becomes a quoted prefix term and all terms must match.
fn match_expression(query: &SearchQuery) -> Option<String> {
    let text = query.text.trim();
    if text.is_empty() {
        return None;
    }
    if query.raw_fts_syntax {
        return Some(text.to_string());
    }
    let terms = text
        .split_whitespace()
        .map(|word| format!("\"{}\"*", word.replace('"', "\"\"")))
        .collect::<Vec<_>>();
    Some(terms.join(" AND "))
}

fn classify(err: rusqlite::Error, expression: &str) -> SearchError {
    let syntax_problem = match &err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            let message = message.to_ascii_lowercase();
            message.contains("syntax error")
                || message.contains("malformed match")
                || message.contains("unterminated")
                || message.contains("no such column")
        }
        _ => false,
    };
    if syntax_problem {
        return SearchError::InvalidQuery {
            expression: expression.to_string(),
            reason: err.to_string(),
        };
    }
    SearchError::Db(DbError::Sqlite(err))
}

#[cfg(test)]
mod tests {
    use super::{match_expression, SearchError, SearchKind, SearchQuery};

    #[test]
    fn words_become_quoted_prefix_terms() {
        let query = SearchQuery::new(r#"tom "soup"#);
        assert_eq!(
            match_expression(&query).as_deref(),
            Some(r#""tom"* AND """soup"*"#)
        );
    }

    #[test]
    fn blank_text_has_no_expression() {
        assert_eq!(match_expression(&SearchQuery::new(" \t ")), None);
    }

    #[test]
    fn raw_text_is_passed_through() {
        let query = SearchQuery {
            raw_fts_syntax: true,
            ..SearchQuery::new(" leek OR onion ")
        };
        assert_eq!(match_expression(&query).as_deref(), Some("leek OR onion"));
    }

    #[test]
    fn kinds_parse_case_insensitively() {
        assert_eq!("Recipe".parse::<SearchKind>().unwrap(), SearchKind::Recipe);
        assert_eq!(
            " ingredients ".parse::<SearchKind>().unwrap(),
            SearchKind::Ingredient
        );
        assert!(matches!(
            "widget".parse::<SearchKind>(),
            Err(SearchError::UnknownKind(kind)) if kind == "widget"
        ));
    }
}
