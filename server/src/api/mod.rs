//! HTTP surface of the todo lists service.
//!
//! # Design
//! Handlers are thin: each one decodes its inputs through the extractors in
//! [`extract`], calls one `TodoService` operation or enqueues one job, and
//! converts the outcome into a response. All state lives in [`AppState`],
//! which is built once by the caller and cloned into every request.
//!
//! Routes keep their trailing slash: `/todo-lists/` and `/todo-lists` are
//! different paths.

mod extract;
mod lists;
mod tasks;
mod todos;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use todo_core::{Page, TaskDispatcher, TodoService};
use tower_http::trace::TraceLayer;

pub use tasks::{TaskDescriptor, UploadRequest, AVAILABLE_TASKS};

#[derive(Clone)]
pub struct AppState {
    pub service: TodoService,
    pub tasks: Arc<dyn TaskDispatcher>,
}

impl AppState {
    pub fn new(service: TodoService, tasks: Arc<dyn TaskDispatcher>) -> Self {
        Self { service, tasks }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/todo-lists/",
            get(lists::list_todo_lists).post(lists::create_todo_list),
        )
        .route(
            "/todo-lists/{id}/",
            get(lists::get_todo_list)
                .patch(lists::update_todo_list)
                .delete(lists::delete_todo_list),
        )
        .route(
            "/todo-lists/{id}/todos/",
            get(todos::list_todos).post(todos::create_todo),
        )
        .route(
            "/todo-lists/{id}/todos/{todo_id}/",
            get(todos::get_todo)
                .patch(todos::update_todo)
                .delete(todos::delete_todo),
        )
        .route("/todos/search/", get(todos::search_todos))
        .route("/tasks/", get(tasks::list_tasks))
        .route("/tasks/upload/", post(tasks::upload))
        .route("/tasks/cleanup/", post(tasks::cleanup))
        .route("/tasks/reminders/", post(tasks::reminders))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Envelope for every collection response.
#[derive(Debug, Serialize, Deserialize)]
pub struct Collection<T> {
    pub results: Vec<T>,
    pub count: usize,
}

impl<T> From<Vec<T>> for Collection<T> {
    fn from(results: Vec<T>) -> Self {
        let count = results.len();
        Self { results, count }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    limit: Option<u32>,
    offset: Option<u32>,
}

impl From<ListParams> for Page {
    fn from(params: ListParams) -> Self {
        Page::new(params.limit, params.offset)
    }
}
