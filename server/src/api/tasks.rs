//! Endpoints that hand work to the background runtime. None of them wait for
//! the job; they answer 202 with the task id as soon as it is queued.

use std::path::PathBuf;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use todo_core::Job;
use tracing::info;

use super::extract::JsonBody;
use super::AppState;
use crate::error::ApiErrorResponse;

/// One entry of the `GET /tasks/` catalogue.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TaskDescriptor {
    pub name: &'static str,
    pub endpoint: &'static str,
    pub method: &'static str,
    pub description: &'static str,
    pub required_params: &'static [&'static str],
}

pub const AVAILABLE_TASKS: [TaskDescriptor; 3] = [
    TaskDescriptor {
        name: "process_todo_upload",
        endpoint: "/tasks/upload/",
        method: "POST",
        description: "Import a CSV file of todos into a new todo list",
        required_params: &["file_path"],
    },
    TaskDescriptor {
        name: "cleanup_old_todos",
        endpoint: "/tasks/cleanup/",
        method: "POST",
        description: "Clean up old todos",
        required_params: &[],
    },
    TaskDescriptor {
        name: "send_todo_reminders",
        endpoint: "/tasks/reminders/",
        method: "POST",
        description: "Send reminders for overdue todos",
        required_params: &[],
    },
];

#[derive(Debug, Default, Deserialize)]
pub struct UploadRequest {
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub todo_list_name: Option<String>,
}

pub(super) async fn list_tasks() -> Json<Value> {
    Json(json!({ "available_tasks": AVAILABLE_TASKS }))
}

pub(super) async fn upload(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<UploadRequest>,
) -> Result<(StatusCode, Json<Value>), ApiErrorResponse> {
    let file_path = non_blank(request.file_path)
        .ok_or_else(|| ApiErrorResponse::validation("file_path is required"))?;
    let job = Job::ProcessTodoUpload {
        file_path: PathBuf::from(&file_path),
        list_name: non_blank(request.todo_list_name),
    };

    let receipt = state.tasks.enqueue(job)?;
    info!(task_id = %receipt.task_id, %file_path, "upload queued");
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "message": "Todo upload queued for processing",
            "file_path": file_path,
            "task_id": receipt.task_id,
        })),
    ))
}

pub(super) async fn cleanup(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Value>), ApiErrorResponse> {
    accepted(&state, Job::CleanupOldTodos, "Cleanup task queued")
}

pub(super) async fn reminders(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Value>), ApiErrorResponse> {
    accepted(&state, Job::SendTodoReminders, "Reminder task queued")
}

fn accepted(
    state: &AppState,
    job: Job,
    message: &str,
) -> Result<(StatusCode, Json<Value>), ApiErrorResponse> {
    let name = job.name();
    let receipt = state.tasks.enqueue(job)?;
    info!(task_id = %receipt.task_id, job = name, "task queued");
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": message, "task_id": receipt.task_id })),
    ))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
