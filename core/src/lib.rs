//! Domain core of the todo lists service.
//!
//! # Overview
//! Owns everything below the HTTP layer: the entities, the relational store,
//! the full-text search mirror, the domain operations, the CSV upload use
//! case, and the background job runtime.
//!
//! # Design
//! - `TodoService` is the single entry point for domain operations; it talks
//!   to storage and search only through the `TodoStore` and `SearchIndex`
//!   traits.
//! - The relational store is the source of truth. The search mirror is a
//!   separate database that is written explicitly, per `SearchSyncPolicy`.
//! - Background work goes through an explicitly started `TaskRuntime`; there
//!   is no process-wide queue.

pub mod error;
pub mod search;
pub mod service;
pub mod store;
pub mod tasks;
pub mod types;
pub mod upload;

pub use error::{StoreError, TodoError, TodoResult};
pub use search::{FtsSearchIndex, SearchDocument, SearchError, SearchIndex};
pub use service::{SearchSyncPolicy, TodoService};
pub use store::{SqliteStore, TodoStore};
pub use tasks::{
    Job, JobOutcome, JobReport, TaskDispatcher, TaskError, TaskQueue, TaskReceipt, TaskRuntime,
    TaskSettings, WorkerPool,
};
pub use types::{
    CreateTodo, CreateTodoList, ListId, Page, Todo, TodoDraft, TodoId, TodoList, TodoListPatch,
    TodoPatch,
};
pub use upload::{UploadError, UploadSummary, UploadTodoList};
