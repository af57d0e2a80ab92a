//! Domain entities and request payloads for todo lists.
//!
//! # Design
//! Entities (`TodoList`, `Todo`) are what the store returns and what the HTTP
//! layer serializes. Payloads (`CreateTodoList`, `CreateTodo`) and patches
//! (`TodoListPatch`, `TodoPatch`) are what callers send in. Patches carry one
//! `Option` per updatable field and reject unknown keys, so a partial update
//! can only ever touch the fields listed here.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub type ListId = i64;
pub type TodoId = i64;

/// Longest accepted list name or todo title, in characters.
pub const MAX_NAME_LEN: usize = 200;

/// A named collection owning zero or more todos.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoList {
    pub id: ListId,
    pub name: String,
    pub todos_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single task item owned by exactly one list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub list_id: ListId,
    /// Name of the owning list at read time.
    pub list_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for creating a todo list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTodoList {
    pub name: String,
}

/// Request payload for creating a todo under a list. The owning list comes
/// from the route, not the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTodo {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

/// A todo ready to be inserted: defaults already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoDraft {
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
}

impl CreateTodo {
    /// Resolves optional fields against `today`: an absent description
    /// becomes empty, an absent due date becomes the creation date.
    pub fn into_draft(self, today: NaiveDate) -> TodoDraft {
        TodoDraft {
            title: self.title,
            description: self.description.unwrap_or_default(),
            due_date: self.due_date.unwrap_or(today),
        }
    }
}

/// Partial update for a todo list. Only fields present in the JSON are
/// applied; omitted fields remain unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TodoListPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl TodoListPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
    }

    pub fn apply_to(self, list: &mut TodoList) {
        if let Some(name) = self.name {
            list.name = name;
        }
    }
}

/// Partial update for a todo. Only fields present in the JSON are applied;
/// omitted fields remain unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TodoPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

impl TodoPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.due_date.is_none()
    }

    pub fn apply_to(self, todo: &mut Todo) {
        if let Some(title) = self.title {
            todo.title = title;
        }
        if let Some(description) = self.description {
            todo.description = description;
        }
        if let Some(due_date) = self.due_date {
            todo.due_date = due_date;
        }
    }
}

/// Optional window over a collection, ordered by ascending id.
///
/// An absent `limit` means "everything from `offset` on".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Page {
    pub const MAX_LIMIT: u32 = 1000;

    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self { limit, offset }
    }

    /// SQLite `LIMIT` value; `-1` removes the bound.
    pub fn sql_limit(&self) -> i64 {
        self.limit
            .map_or(-1, |limit| i64::from(limit.min(Self::MAX_LIMIT)))
    }

    pub fn sql_offset(&self) -> i64 {
        i64::from(self.offset.unwrap_or(0))
    }
}

/// Next `updated_at` for an entity last touched at `previous`. Never moves
/// backwards, even if the wall clock does.
pub fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(previous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_todo() -> Todo {
        let now = Utc::now();
        Todo {
            id: 2,
            title: "Buy milk".to_string(),
            description: "semi-skimmed".to_string(),
            due_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            list_id: 1,
            list_name: "Groceries".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn create_todo_defaults_description_and_due_date() {
        let input: CreateTodo = serde_json::from_str(r#"{"title":"Walk dog"}"#).unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let draft = input.into_draft(today);
        assert_eq!(draft.title, "Walk dog");
        assert_eq!(draft.description, "");
        assert_eq!(draft.due_date, today);
    }

    #[test]
    fn create_todo_rejects_missing_title() {
        let result: Result<CreateTodo, _> = serde_json::from_str(r#"{"description":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn create_todo_rejects_malformed_due_date() {
        let result: Result<CreateTodo, _> =
            serde_json::from_str(r#"{"title":"x","due_date":"next week"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn todo_patch_rejects_unknown_keys() {
        let result: Result<TodoPatch, _> = serde_json::from_str(r#"{"completed":true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn empty_patch_leaves_todo_unchanged() {
        let patch: TodoPatch = serde_json::from_str("{}").unwrap();
        assert!(patch.is_empty());
        let mut todo = sample_todo();
        let before = todo.clone();
        patch.apply_to(&mut todo);
        assert_eq!(todo, before);
    }

    #[test]
    fn patch_applies_only_present_fields() {
        let patch: TodoPatch = serde_json::from_str(r#"{"title":"new"}"#).unwrap();
        let mut todo = sample_todo();
        patch.apply_to(&mut todo);
        assert_eq!(todo.title, "new");
        assert_eq!(todo.description, "semi-skimmed");
        assert_eq!(todo.due_date, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    }

    #[test]
    fn null_fields_count_as_absent() {
        let patch: TodoListPatch = serde_json::from_str(r#"{"name":null}"#).unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn page_limit_is_capped() {
        assert_eq!(Page::default().sql_limit(), -1);
        assert_eq!(Page::new(Some(5), None).sql_limit(), 5);
        assert_eq!(Page::new(Some(50_000), Some(3)).sql_limit(), 1000);
        assert_eq!(Page::new(Some(50_000), Some(3)).sql_offset(), 3);
    }

    #[test]
    fn next_timestamp_never_goes_backwards() {
        let future = Utc::now() + Duration::hours(1);
        assert_eq!(next_timestamp(future), future);
        let past = Utc::now() - Duration::hours(1);
        assert!(next_timestamp(past) > past);
    }
}
