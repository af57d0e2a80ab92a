use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use todo_core::{CreateTodoList, ListId, TodoList, TodoListPatch};

use super::extract::{JsonBody, PathParams, QueryParams};
use super::{AppState, Collection, ListParams};
use crate::error::ApiErrorResponse;

pub(super) async fn list_todo_lists(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ListParams>,
) -> Result<Json<Collection<TodoList>>, ApiErrorResponse> {
    let lists = state.service.list_todo_lists(params.into()).await?;
    Ok(Json(lists.into()))
}

pub(super) async fn create_todo_list(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CreateTodoList>,
) -> Result<(StatusCode, Json<TodoList>), ApiErrorResponse> {
    let list = state.service.create_todo_list(&input.name).await?;
    Ok((StatusCode::CREATED, Json(list)))
}

pub(super) async fn get_todo_list(
    State(state): State<AppState>,
    PathParams(id): PathParams<ListId>,
) -> Result<Json<TodoList>, ApiErrorResponse> {
    Ok(Json(state.service.get_todo_list(id).await?))
}

pub(super) async fn update_todo_list(
    State(state): State<AppState>,
    PathParams(id): PathParams<ListId>,
    JsonBody(patch): JsonBody<TodoListPatch>,
) -> Result<Json<TodoList>, ApiErrorResponse> {
    Ok(Json(state.service.update_todo_list(id, patch).await?))
}

pub(super) async fn delete_todo_list(
    State(state): State<AppState>,
    PathParams(id): PathParams<ListId>,
) -> Result<StatusCode, ApiErrorResponse> {
    state.service.delete_todo_list(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
