//! Full-text search mirror of todos.
//!
//! # Responsibility
//! - Keep a denormalized copy of todos keyed by todo id.
//! - Answer title match queries.
//!
//! # Invariants
//! - The mirror is never authoritative; the relational store is. Documents
//!   may be stale or missing, and nothing here reads from the store.
//! - Matching is term-based and case-insensitive: a document matches when
//!   any query term appears as a token of its title.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::types::{ListId, Todo, TodoId};

/// Upper bound on hits returned by one query.
pub const MAX_HITS: i64 = 100;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search index error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("no search document for todo {0}")]
    DocumentNotFound(TodoId),
}

pub type SearchResult<T> = Result<T, SearchError>;

/// A todo as the search mirror sees it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchDocument {
    pub todo_id: TodoId,
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub list_id: ListId,
}

impl From<&Todo> for SearchDocument {
    fn from(todo: &Todo) -> Self {
        Self {
            todo_id: todo.id,
            title: todo.title.clone(),
            description: todo.description.clone(),
            due_date: todo.due_date,
            list_id: todo.list_id,
        }
    }
}

/// Write and read side of the search mirror.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Creates or overwrites the document keyed by `todo.id`.
    async fn index_todo(&self, todo: &Todo) -> SearchResult<()>;

    /// Overwrites every mirrored field of an existing document.
    async fn update_indexed_todo(&self, todo: &Todo) -> SearchResult<()>;

    async fn delete_indexed_todo(&self, todo_id: TodoId) -> SearchResult<()>;

    async fn get_document(&self, todo_id: TodoId) -> SearchResult<Option<SearchDocument>>;

    /// Documents whose title matches `query`. Blank queries match nothing.
    async fn search_todos(&self, query: &str) -> SearchResult<Vec<SearchDocument>>;

    async fn index_todos(&self, todos: &[Todo]) -> SearchResult<()> {
        for todo in todos {
            self.index_todo(todo).await?;
        }
        Ok(())
    }
}

/// Search mirror on a dedicated SQLite FTS5 database, separate from the
/// relational store.
#[derive(Clone)]
pub struct FtsSearchIndex {
    conn: Arc<Mutex<Connection>>,
}

impl FtsSearchIndex {
    pub fn open(path: impl AsRef<Path>) -> SearchResult<Self> {
        Self::bootstrap(Connection::open(path)?)
    }

    pub fn open_in_memory() -> SearchResult<Self> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> SearchResult<Self> {
        conn.execute_batch(
            "CREATE VIRTUAL TABLE IF NOT EXISTS todo_documents USING fts5(
                title,
                description,
                due_date UNINDEXED,
                list_id UNINDEXED,
                tokenize = 'unicode61'
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<SearchDocument> {
    Ok(SearchDocument {
        todo_id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        due_date: row.get(3)?,
        list_id: row.get(4)?,
    })
}

/// Builds an FTS5 expression matching any query term against the title
/// column. Terms are quoted so user input never reaches FTS5 syntax.
fn build_match_expression(query: &str) -> Option<String> {
    let terms = query
        .split_whitespace()
        .map(|term| format!("title : \"{}\"", term.replace('"', "\"\"")))
        .collect::<Vec<_>>();
    if terms.is_empty() {
        return None;
    }
    Some(terms.join(" OR "))
}

#[async_trait]
impl SearchIndex for FtsSearchIndex {
    async fn index_todo(&self, todo: &Todo) -> SearchResult<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM todo_documents WHERE rowid = ?1", params![todo.id])?;
        tx.execute(
            "INSERT INTO todo_documents (rowid, title, description, due_date, list_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![todo.id, todo.title, todo.description, todo.due_date, todo.list_id],
        )?;
        tx.commit()?;
        debug!(todo_id = todo.id, "todo indexed");
        Ok(())
    }

    async fn update_indexed_todo(&self, todo: &Todo) -> SearchResult<()> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE todo_documents SET title = ?1, description = ?2, due_date = ?3, list_id = ?4
             WHERE rowid = ?5",
            params![todo.title, todo.description, todo.due_date, todo.list_id, todo.id],
        )?;
        if changed == 0 {
            return Err(SearchError::DocumentNotFound(todo.id));
        }
        Ok(())
    }

    async fn delete_indexed_todo(&self, todo_id: TodoId) -> SearchResult<()> {
        let conn = self.conn.lock().await;
        let changed = conn.execute("DELETE FROM todo_documents WHERE rowid = ?1", params![todo_id])?;
        if changed == 0 {
            return Err(SearchError::DocumentNotFound(todo_id));
        }
        Ok(())
    }

    async fn get_document(&self, todo_id: TodoId) -> SearchResult<Option<SearchDocument>> {
        let conn = self.conn.lock().await;
        let document = conn
            .query_row(
                "SELECT rowid, title, description, due_date, list_id
                 FROM todo_documents WHERE rowid = ?1",
                params![todo_id],
                row_to_document,
            )
            .optional()?;
        Ok(document)
    }

    async fn search_todos(&self, query: &str) -> SearchResult<Vec<SearchDocument>> {
        let Some(expression) = build_match_expression(query) else {
            return Ok(Vec::new());
        };
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT rowid, title, description, due_date, list_id
             FROM todo_documents WHERE todo_documents MATCH ?1
             ORDER BY rank, rowid LIMIT ?2",
        )?;
        let documents = stmt
            .query_map(params![expression, MAX_HITS], row_to_document)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::rstest;

    fn todo(id: TodoId, title: &str) -> Todo {
        let now = Utc::now();
        Todo {
            id,
            title: title.to_string(),
            description: format!("about {title}"),
            due_date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            list_id: 7,
            list_name: "Groceries".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[rstest]
    #[case("", None)]
    #[case("   ", None)]
    #[case("milk", Some(r#"title : "milk""#))]
    #[case("buy  milk", Some(r#"title : "buy" OR title : "milk""#))]
    #[case(r#"say "hi""#, Some(r#"title : "say" OR title : """hi""""#))]
    fn match_expression_quotes_terms(#[case] query: &str, #[case] expected: Option<&str>) {
        assert_eq!(build_match_expression(query).as_deref(), expected);
    }

    #[tokio::test]
    async fn search_matches_title_terms_case_insensitively() {
        let index = FtsSearchIndex::open_in_memory().unwrap();
        index.index_todo(&todo(1, "Buy milk")).await.unwrap();
        index.index_todo(&todo(2, "Walk the dog")).await.unwrap();

        let hits = index.search_todos("MILK").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].todo_id, 1);
        assert_eq!(hits[0].list_id, 7);

        let hits = index.search_todos("dog milk").await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn search_ignores_description() {
        let index = FtsSearchIndex::open_in_memory().unwrap();
        index.index_todo(&todo(1, "Buy milk")).await.unwrap();
        assert!(index.search_todos("about").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn index_todo_overwrites_existing_document() {
        let index = FtsSearchIndex::open_in_memory().unwrap();
        index.index_todo(&todo(1, "old title")).await.unwrap();
        index.index_todo(&todo(1, "new title")).await.unwrap();

        let document = index.get_document(1).await.unwrap().unwrap();
        assert_eq!(document.title, "new title");
        assert!(index.search_todos("old").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_requires_existing_document() {
        let index = FtsSearchIndex::open_in_memory().unwrap();
        let err = index.update_indexed_todo(&todo(9, "x")).await.unwrap_err();
        assert!(matches!(err, SearchError::DocumentNotFound(9)));

        index.index_todo(&todo(9, "x")).await.unwrap();
        let mut changed = todo(9, "y");
        changed.due_date = NaiveDate::from_ymd_opt(2027, 1, 1).unwrap();
        index.update_indexed_todo(&changed).await.unwrap();
        assert_eq!(index.get_document(9).await.unwrap(), Some(SearchDocument::from(&changed)));
    }

    #[tokio::test]
    async fn delete_removes_document() {
        let index = FtsSearchIndex::open_in_memory().unwrap();
        index.index_todo(&todo(3, "Call mom")).await.unwrap();
        index.delete_indexed_todo(3).await.unwrap();

        assert!(index.get_document(3).await.unwrap().is_none());
        assert!(index.search_todos("mom").await.unwrap().is_empty());
        assert!(matches!(
            index.delete_indexed_todo(3).await,
            Err(SearchError::DocumentNotFound(3))
        ));
    }
}
