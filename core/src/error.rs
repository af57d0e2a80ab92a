//! Error types for the todo domain.
//!
//! # Design
//! Not-found gets dedicated variants because every caller distinguishes
//! "the resource does not exist" from "the backend failed." Storage and
//! search failures are wrapped unchanged so the HTTP layer can log the
//! underlying cause and answer with a generic server error.

use thiserror::Error;

use crate::search::SearchError;
use crate::types::{ListId, TodoId};

/// Errors raised by the relational store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by `TodoService` operations.
#[derive(Debug, Error)]
pub enum TodoError {
    #[error("Todo list {0} not found")]
    ListNotFound(ListId),

    #[error("Todo {todo_id} not found in list {list_id}")]
    TodoNotFound { list_id: ListId, todo_id: TodoId },

    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Search(#[from] SearchError),
}

impl TodoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ListNotFound(_) | Self::TodoNotFound { .. })
    }

    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

pub type TodoResult<T> = Result<T, TodoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_messages_name_the_ids() {
        assert_eq!(TodoError::ListNotFound(5).to_string(), "Todo list 5 not found");
        let err = TodoError::TodoNotFound {
            list_id: 1,
            todo_id: 2,
        };
        assert_eq!(err.to_string(), "Todo 2 not found in list 1");
        assert!(err.is_not_found());
    }

    #[test]
    fn validation_is_not_a_not_found() {
        let err = TodoError::validation("title", "must not be blank");
        assert_eq!(err.to_string(), "title: must not be blank");
        assert!(!err.is_not_found());
    }
}
