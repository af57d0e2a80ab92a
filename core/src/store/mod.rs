//! Relational storage for todo lists and todos.
//!
//! `TodoStore` is the seam between the domain service and the database.
//! The only implementation is SQLite ([`SqliteStore`]); tests open it in
//! memory.

mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::StoreResult;
use crate::types::{ListId, Page, Todo, TodoDraft, TodoId, TodoList};

/// Persistence operations over the two entities.
///
/// Lookups return `Ok(None)` and deletes return `Ok(false)` when nothing
/// matches; turning that into a not-found error is the caller's job.
#[async_trait]
pub trait TodoStore: Send + Sync {
    async fn insert_list(&self, name: &str) -> StoreResult<TodoList>;

    async fn find_list(&self, id: ListId) -> StoreResult<Option<TodoList>>;

    async fn list_lists(&self, page: Page) -> StoreResult<Vec<TodoList>>;

    /// Writes `name` and `updated_at` of an existing list.
    async fn save_list(&self, list: &TodoList) -> StoreResult<bool>;

    /// Deletes the list and, through the foreign key, all of its todos.
    async fn delete_list(&self, id: ListId) -> StoreResult<bool>;

    async fn insert_todo(&self, list_id: ListId, draft: &TodoDraft) -> StoreResult<Todo>;

    async fn find_todo(&self, list_id: ListId, todo_id: TodoId) -> StoreResult<Option<Todo>>;

    async fn list_todos(&self, list_id: ListId, page: Page) -> StoreResult<Vec<Todo>>;

    /// Writes the mutable fields and `updated_at` of an existing todo.
    async fn save_todo(&self, todo: &Todo) -> StoreResult<bool>;

    async fn delete_todo(&self, list_id: ListId, todo_id: TodoId) -> StoreResult<bool>;

    /// Creates a list and all of `drafts` under it in one transaction.
    async fn insert_list_with_todos(
        &self,
        name: &str,
        drafts: &[TodoDraft],
    ) -> StoreResult<(TodoList, Vec<Todo>)>;

    /// Todos whose due date is strictly before `date`, across all lists.
    async fn todos_due_before(&self, date: NaiveDate) -> StoreResult<Vec<Todo>>;
}
