//! Domain operations over todo lists and todos.
//!
//! # Design
//! `TodoService` is cheap to clone: it holds the store and the search mirror
//! behind `Arc`s, plus the mirror consistency policy. Every operation is a
//! single attempt; not-found outcomes become `TodoError::*NotFound`, and
//! backend failures are passed through untouched.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::error::{TodoError, TodoResult};
use crate::search::{SearchDocument, SearchIndex};
use crate::store::TodoStore;
use crate::types::{
    next_timestamp, CreateTodo, ListId, Page, Todo, TodoDraft, TodoId, TodoList, TodoListPatch,
    TodoPatch, MAX_NAME_LEN,
};

/// Which writes are propagated to the search mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchSyncPolicy {
    /// Only bulk uploads write the mirror; single-todo writes let it drift.
    #[default]
    UploadOnly,
    /// Single-todo create/update/delete also write the mirror. Mirror
    /// failures on those paths are logged, never returned.
    AllWrites,
}

impl FromStr for SearchSyncPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "upload_only" | "upload-only" | "uploads" => Ok(Self::UploadOnly),
            "all_writes" | "all-writes" | "all" => Ok(Self::AllWrites),
            other => Err(format!("unknown search sync policy `{other}`")),
        }
    }
}

impl fmt::Display for SearchSyncPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UploadOnly => write!(f, "upload_only"),
            Self::AllWrites => write!(f, "all_writes"),
        }
    }
}

#[derive(Clone)]
pub struct TodoService {
    store: Arc<dyn TodoStore>,
    search: Arc<dyn SearchIndex>,
    sync: SearchSyncPolicy,
}

impl TodoService {
    pub fn new(
        store: Arc<dyn TodoStore>,
        search: Arc<dyn SearchIndex>,
        sync: SearchSyncPolicy,
    ) -> Self {
        Self {
            store,
            search,
            sync,
        }
    }

    pub fn sync_policy(&self) -> SearchSyncPolicy {
        self.sync
    }

    pub fn search_index(&self) -> &Arc<dyn SearchIndex> {
        &self.search
    }

    // --- todo lists ---

    pub async fn create_todo_list(&self, name: &str) -> TodoResult<TodoList> {
        let name = validate_text("name", name)?;
        let list = self.store.insert_list(&name).await?;
        info!(list_id = list.id, "todo list created");
        Ok(list)
    }

    pub async fn update_todo_list(&self, id: ListId, patch: TodoListPatch) -> TodoResult<TodoList> {
        let mut list = self.get_todo_list(id).await?;
        if patch.is_empty() {
            return Ok(list);
        }
        let patch = TodoListPatch {
            name: patch
                .name
                .map(|name| validate_text("name", &name))
                .transpose()?,
        };
        patch.apply_to(&mut list);
        list.updated_at = next_timestamp(list.updated_at);
        if !self.store.save_list(&list).await? {
            return Err(TodoError::ListNotFound(id));
        }
        debug!(list_id = id, "todo list updated");
        Ok(list)
    }

    pub async fn delete_todo_list(&self, id: ListId) -> TodoResult<()> {
        let todos = match self.sync {
            SearchSyncPolicy::AllWrites => self.store.list_todos(id, Page::default()).await?,
            SearchSyncPolicy::UploadOnly => Vec::new(),
        };
        if !self.store.delete_list(id).await? {
            return Err(TodoError::ListNotFound(id));
        }
        info!(list_id = id, "todo list deleted");
        for todo in &todos {
            self.unmirror(todo.id).await;
        }
        Ok(())
    }

    pub async fn list_todo_lists(&self, page: Page) -> TodoResult<Vec<TodoList>> {
        Ok(self.store.list_lists(page).await?)
    }

    pub async fn get_todo_list(&self, id: ListId) -> TodoResult<TodoList> {
        self.store
            .find_list(id)
            .await?
            .ok_or(TodoError::ListNotFound(id))
    }

    pub async fn get_todo_list_todos(&self, list_id: ListId, page: Page) -> TodoResult<Vec<Todo>> {
        self.get_todo_list(list_id).await?;
        Ok(self.store.list_todos(list_id, page).await?)
    }

    // --- todos ---

    pub async fn get_todo(&self, list_id: ListId, todo_id: TodoId) -> TodoResult<Todo> {
        self.store
            .find_todo(list_id, todo_id)
            .await?
            .ok_or(TodoError::TodoNotFound { list_id, todo_id })
    }

    pub async fn create_todo(&self, list_id: ListId, input: CreateTodo) -> TodoResult<Todo> {
        let list = self.get_todo_list(list_id).await?;
        let mut draft = input.into_draft(Utc::now().date_naive());
        draft.title = validate_text("title", &draft.title)?;
        let todo = self.store.insert_todo(list.id, &draft).await?;
        info!(list_id, todo_id = todo.id, "todo created");
        if self.sync == SearchSyncPolicy::AllWrites {
            if let Err(error) = self.search.index_todo(&todo).await {
                warn!(todo_id = todo.id, %error, "search mirror not updated");
            }
        }
        Ok(todo)
    }

    pub async fn update_todo(
        &self,
        list_id: ListId,
        todo_id: TodoId,
        patch: TodoPatch,
    ) -> TodoResult<Todo> {
        let mut todo = self.get_todo(list_id, todo_id).await?;
        if patch.is_empty() {
            return Ok(todo);
        }
        let patch = TodoPatch {
            title: patch
                .title
                .map(|title| validate_text("title", &title))
                .transpose()?,
            ..patch
        };
        patch.apply_to(&mut todo);
        todo.updated_at = next_timestamp(todo.updated_at);
        if !self.store.save_todo(&todo).await? {
            return Err(TodoError::TodoNotFound { list_id, todo_id });
        }
        debug!(list_id, todo_id, "todo updated");
        if self.sync == SearchSyncPolicy::AllWrites {
            if let Err(error) = self.search.update_indexed_todo(&todo).await {
                warn!(todo_id, %error, "search mirror not updated");
            }
        }
        Ok(todo)
    }

    pub async fn delete_todo(&self, list_id: ListId, todo_id: TodoId) -> TodoResult<()> {
        if !self.store.delete_todo(list_id, todo_id).await? {
            return Err(TodoError::TodoNotFound { list_id, todo_id });
        }
        debug!(list_id, todo_id, "todo deleted");
        if self.sync == SearchSyncPolicy::AllWrites {
            self.unmirror(todo_id).await;
        }
        Ok(())
    }

    // --- bulk, search, maintenance ---

    /// Creates a list together with its todos in one store transaction.
    /// Titles are validated before anything is written.
    pub async fn import_todo_list(
        &self,
        name: &str,
        drafts: &[TodoDraft],
    ) -> TodoResult<(TodoList, Vec<Todo>)> {
        let name = validate_text("name", name)?;
        let drafts = drafts
            .iter()
            .map(|draft| {
                Ok(TodoDraft {
                    title: validate_text("title", &draft.title)?,
                    ..draft.clone()
                })
            })
            .collect::<TodoResult<Vec<_>>>()?;
        let (list, todos) = self.store.insert_list_with_todos(&name, &drafts).await?;
        info!(list_id = list.id, todos = todos.len(), "todo list imported");
        Ok((list, todos))
    }

    pub async fn search_todos(&self, query: &str) -> TodoResult<Vec<SearchDocument>> {
        Ok(self.search.search_todos(query).await?)
    }

    /// Todos due strictly before `today`.
    pub async fn overdue_todos(&self, today: NaiveDate) -> TodoResult<Vec<Todo>> {
        Ok(self.store.todos_due_before(today).await?)
    }

    async fn unmirror(&self, todo_id: TodoId) {
        if let Err(error) = self.search.delete_indexed_todo(todo_id).await {
            warn!(todo_id, %error, "search mirror not updated");
        }
    }
}

/// Trims `value` and checks it is non-blank and within `MAX_NAME_LEN`.
fn validate_text(field: &'static str, value: &str) -> TodoResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TodoError::validation(field, "must not be blank"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(TodoError::validation(
            field,
            format!("must be at most {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(trimmed.to_string())
}
