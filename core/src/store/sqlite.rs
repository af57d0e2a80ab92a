//! SQLite-backed `TodoStore`.
//!
//! # Invariants
//! - Every connection runs with `foreign_keys=ON`, so deleting a list
//!   cascades to its todos.
//! - The schema is applied before the store is handed out.
//! - Statements never outlive the connection guard; each operation runs to
//!   completion inside one lock acquisition.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::TodoStore;
use crate::error::StoreResult;
use crate::types::{ListId, Page, Todo, TodoDraft, TodoId, TodoList};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS todo_lists (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS todos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    due_date TEXT NOT NULL,
    list_id INTEGER NOT NULL REFERENCES todo_lists(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_todos_list ON todos(list_id);
CREATE INDEX IF NOT EXISTS idx_todos_due_date ON todos(due_date);
";

const LIST_COLUMNS: &str = "l.id, l.name, l.created_at, l.updated_at,
    (SELECT COUNT(*) FROM todos t WHERE t.list_id = l.id)";

const TODO_COLUMNS: &str =
    "t.id, t.title, t.description, t.due_date, t.list_id, l.name, t.created_at, t.updated_at";

const TODO_SOURCE: &str = "todos t JOIN todo_lists l ON l.id = t.list_id";

/// Relational store on a single SQLite connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) a database file and applies the schema.
    /// `":memory:"` opens a private in-memory database.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let started_at = Instant::now();
        let conn = Connection::open(path)?;
        let store = Self::bootstrap(conn)?;
        info!(
            path = %path.display(),
            duration_ms = started_at.elapsed().as_millis() as u64,
            "todo store opened"
        );
        Ok(store)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> StoreResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<R, F>(&self, f: F) -> StoreResult<R>
    where
        F: FnOnce(&mut Connection) -> StoreResult<R> + Send,
        R: Send,
    {
        let mut conn = self.conn.lock().await;
        f(&mut conn)
    }
}

fn row_to_list(row: &Row<'_>) -> rusqlite::Result<TodoList> {
    Ok(TodoList {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
        todos_count: row.get(4)?,
    })
}

fn row_to_todo(row: &Row<'_>) -> rusqlite::Result<Todo> {
    Ok(Todo {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        due_date: row.get(3)?,
        list_id: row.get(4)?,
        list_name: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn insert_list_row(conn: &Connection, name: &str) -> StoreResult<TodoList> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO todo_lists (name, created_at, updated_at) VALUES (?1, ?2, ?3)",
        params![name, now, now],
    )?;
    Ok(TodoList {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        todos_count: 0,
        created_at: now,
        updated_at: now,
    })
}

fn insert_todo_row(
    conn: &Connection,
    list_id: ListId,
    list_name: &str,
    draft: &TodoDraft,
) -> StoreResult<Todo> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO todos (title, description, due_date, list_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![draft.title, draft.description, draft.due_date, list_id, now, now],
    )?;
    Ok(Todo {
        id: conn.last_insert_rowid(),
        title: draft.title.clone(),
        description: draft.description.clone(),
        due_date: draft.due_date,
        list_id,
        list_name: list_name.to_string(),
        created_at: now,
        updated_at: now,
    })
}

#[async_trait]
impl TodoStore for SqliteStore {
    async fn insert_list(&self, name: &str) -> StoreResult<TodoList> {
        self.with_conn(|conn| insert_list_row(conn, name)).await
    }

    async fn find_list(&self, id: ListId) -> StoreResult<Option<TodoList>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {LIST_COLUMNS} FROM todo_lists l WHERE l.id = ?1");
            Ok(conn.query_row(&sql, params![id], row_to_list).optional()?)
        })
        .await
    }

    async fn list_lists(&self, page: Page) -> StoreResult<Vec<TodoList>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {LIST_COLUMNS} FROM todo_lists l ORDER BY l.id LIMIT ?1 OFFSET ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let lists = stmt
                .query_map(params![page.sql_limit(), page.sql_offset()], row_to_list)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(lists)
        })
        .await
    }

    async fn save_list(&self, list: &TodoList) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE todo_lists SET name = ?1, updated_at = ?2 WHERE id = ?3",
                params![list.name, list.updated_at, list.id],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn delete_list(&self, id: ListId) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM todo_lists WHERE id = ?1", params![id])?;
            Ok(changed > 0)
        })
        .await
    }

    async fn insert_todo(&self, list_id: ListId, draft: &TodoDraft) -> StoreResult<Todo> {
        self.with_conn(|conn| {
            let list_name: String = conn.query_row(
                "SELECT name FROM todo_lists WHERE id = ?1",
                params![list_id],
                |row| row.get(0),
            )?;
            insert_todo_row(conn, list_id, &list_name, draft)
        })
        .await
    }

    async fn find_todo(&self, list_id: ListId, todo_id: TodoId) -> StoreResult<Option<Todo>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {TODO_COLUMNS} FROM {TODO_SOURCE} WHERE t.id = ?1 AND t.list_id = ?2"
            );
            Ok(conn
                .query_row(&sql, params![todo_id, list_id], row_to_todo)
                .optional()?)
        })
        .await
    }

    async fn list_todos(&self, list_id: ListId, page: Page) -> StoreResult<Vec<Todo>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {TODO_COLUMNS} FROM {TODO_SOURCE}
                 WHERE t.list_id = ?1 ORDER BY t.id LIMIT ?2 OFFSET ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let todos = stmt
                .query_map(
                    params![list_id, page.sql_limit(), page.sql_offset()],
                    row_to_todo,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(todos)
        })
        .await
    }

    async fn save_todo(&self, todo: &Todo) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE todos SET title = ?1, description = ?2, due_date = ?3, updated_at = ?4
                 WHERE id = ?5 AND list_id = ?6",
                params![
                    todo.title,
                    todo.description,
                    todo.due_date,
                    todo.updated_at,
                    todo.id,
                    todo.list_id
                ],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn delete_todo(&self, list_id: ListId, todo_id: TodoId) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM todos WHERE id = ?1 AND list_id = ?2",
                params![todo_id, list_id],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn insert_list_with_todos(
        &self,
        name: &str,
        drafts: &[TodoDraft],
    ) -> StoreResult<(TodoList, Vec<Todo>)> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let mut list = insert_list_row(&tx, name)?;
            let todos = drafts
                .iter()
                .map(|draft| insert_todo_row(&tx, list.id, &list.name, draft))
                .collect::<StoreResult<Vec<_>>>()?;
            tx.commit()?;
            list.todos_count = todos.len() as i64;
            debug!(list_id = list.id, todos = todos.len(), "list imported");
            Ok((list, todos))
        })
        .await
    }

    async fn todos_due_before(&self, date: NaiveDate) -> StoreResult<Vec<Todo>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {TODO_COLUMNS} FROM {TODO_SOURCE}
                 WHERE t.due_date < ?1 ORDER BY t.due_date, t.id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let todos = stmt
                .query_map(params![date], row_to_todo)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(todos)
        })
        .await
    }
}
