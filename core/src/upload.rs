//! Bulk import of a todo list from a CSV file.
//!
//! The file needs a header row naming a `title` column; `description` and
//! `due_date` (`YYYY-MM-DD`) are optional, other columns are ignored. The
//! whole file is parsed before anything is written, and the list plus all of
//! its todos go to the store in one transaction. Indexing runs afterwards and
//! is not rolled back with the store.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::error::TodoError;
use crate::search::SearchError;
use crate::service::TodoService;
use crate::types::{Todo, TodoDraft, TodoList};

const DEFAULT_LIST_NAME: &str = "Uploaded todos";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV header has no `{0}` column")]
    MissingColumn(&'static str),

    #[error("line {line}: title must not be blank")]
    BlankTitle { line: u64 },

    #[error("line {line}: invalid due_date `{value}`, expected YYYY-MM-DD")]
    InvalidDueDate { line: u64, value: String },

    #[error(transparent)]
    Todo(#[from] TodoError),

    /// The todos were stored but at least one could not be indexed.
    #[error("todos stored but not indexed: {0}")]
    Index(#[from] SearchError),
}

impl UploadError {
    /// Whether running the same upload again may succeed without importing
    /// the file twice. `Index` comes after the store commit, so it is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Todo(TodoError::Store(_)))
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
}

/// Parses CSV rows into drafts. Empty descriptions become `""`, empty due
/// dates become `today`.
pub fn read_todo_rows<R: io::Read>(reader: R, today: NaiveDate) -> Result<Vec<TodoDraft>, UploadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    if !headers.iter().any(|header| header == "title") {
        return Err(UploadError::MissingColumn("title"));
    }

    let mut drafts = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |position| position.line());
        let row: CsvRow = record.deserialize(Some(&headers))?;

        if row.title.is_empty() {
            return Err(UploadError::BlankTitle { line });
        }
        let due_date = match row.due_date.filter(|value| !value.is_empty()) {
            None => today,
            Some(value) => NaiveDate::parse_from_str(&value, "%Y-%m-%d")
                .map_err(|_| UploadError::InvalidDueDate { line, value })?,
        };
        drafts.push(TodoDraft {
            title: row.title,
            description: row.description.unwrap_or_default(),
            due_date,
        });
    }
    Ok(drafts)
}

/// List name for an upload that did not specify one: the file stem.
pub fn list_name_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().trim().to_string())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| DEFAULT_LIST_NAME.to_string())
}

/// Creates a new todo list from the rows of a CSV file.
#[derive(Debug, Clone)]
pub struct UploadTodoList {
    pub list_name: String,
    pub file_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct UploadSummary {
    pub list: TodoList,
    pub todos: Vec<Todo>,
}

impl UploadTodoList {
    pub fn new(list_name: impl Into<String>, file_path: impl Into<PathBuf>) -> Self {
        Self {
            list_name: list_name.into(),
            file_path: file_path.into(),
        }
    }

    pub async fn execute(&self, service: &TodoService) -> Result<UploadSummary, UploadError> {
        let bytes = tokio::fs::read(&self.file_path)
            .await
            .map_err(|source| UploadError::Io {
                path: self.file_path.clone(),
                source,
            })?;
        let drafts = read_todo_rows(bytes.as_slice(), Utc::now().date_naive())?;

        let (list, todos) = service.import_todo_list(&self.list_name, &drafts).await?;
        service.search_index().index_todos(&todos).await?;
        info!(
            list_id = list.id,
            todos = todos.len(),
            file = %self.file_path.display(),
            "upload stored and indexed"
        );
        Ok(UploadSummary { list, todos })
    }
}
