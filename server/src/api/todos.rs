use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use todo_core::{CreateTodo, ListId, SearchDocument, Todo, TodoId, TodoPatch};

use super::extract::{JsonBody, PathParams, QueryParams};
use super::{AppState, Collection, ListParams};
use crate::error::ApiErrorResponse;

pub(super) async fn list_todos(
    State(state): State<AppState>,
    PathParams(list_id): PathParams<ListId>,
    QueryParams(params): QueryParams<ListParams>,
) -> Result<Json<Collection<Todo>>, ApiErrorResponse> {
    let todos = state
        .service
        .get_todo_list_todos(list_id, params.into())
        .await?;
    Ok(Json(todos.into()))
}

pub(super) async fn create_todo(
    State(state): State<AppState>,
    PathParams(list_id): PathParams<ListId>,
    JsonBody(input): JsonBody<CreateTodo>,
) -> Result<(StatusCode, Json<Todo>), ApiErrorResponse> {
    let todo = state.service.create_todo(list_id, input).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

pub(super) async fn get_todo(
    State(state): State<AppState>,
    PathParams((list_id, todo_id)): PathParams<(ListId, TodoId)>,
) -> Result<Json<Todo>, ApiErrorResponse> {
    Ok(Json(state.service.get_todo(list_id, todo_id).await?))
}

pub(super) async fn update_todo(
    State(state): State<AppState>,
    PathParams((list_id, todo_id)): PathParams<(ListId, TodoId)>,
    JsonBody(patch): JsonBody<TodoPatch>,
) -> Result<Json<Todo>, ApiErrorResponse> {
    Ok(Json(state.service.update_todo(list_id, todo_id, patch).await?))
}

pub(super) async fn delete_todo(
    State(state): State<AppState>,
    PathParams((list_id, todo_id)): PathParams<(ListId, TodoId)>,
) -> Result<StatusCode, ApiErrorResponse> {
    state.service.delete_todo(list_id, todo_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub(super) struct SearchParams {
    #[serde(default)]
    q: String,
}

pub(super) async fn search_todos(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<SearchParams>,
) -> Result<Json<Collection<SearchDocument>>, ApiErrorResponse> {
    let hits = state.service.search_todos(&params.q).await?;
    Ok(Json(hits.into()))
}
