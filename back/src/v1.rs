use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use todo_api::v1::{CreateTodo, ErrorBody, ErrorKind, ListTodos, Todo, UpdateTodo};
use tracing::{error, info};
use uuid::Uuid;

use crate::{error::ServiceError, item::TodoPatch, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/todos", get(get_todos).post(add_todo))
        .route("/todos/:id", get(get_todo).patch(update_todo))
        .route("/todos/:id/description", put(set_todo_description))
        .route("/todos/:id/due-time", put(set_todo_due_time))
        .route("/todos/:id/done", put(mark_todo_done))
        .route("/todos/:id/not-done", put(mark_todo_not_done))
}

type ApiResult<T> = Result<T, ServiceError>;

async fn get_todos(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListTodos>,
) -> ApiResult<Json<Vec<Todo>>> {
    let mut todos = state.service.list_all(query.include_completed)?;
    todos.sort_unstable_by(|a, b| a.creation_time.cmp(&b.creation_time).reverse());
    Ok(Json(todos.into_iter().map(Todo::from).collect()))
}

async fn add_todo(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateTodo>,
) -> ApiResult<(StatusCode, Json<Todo>)> {
    let todo = state.service.create(input.description, input.due_time)?;

    info!(
        id = %todo.id,
        description = %todo.description,
        due_time = %todo.due_time,
        "created todo"
    );

    Ok((StatusCode::CREATED, Json(todo.into())))
}

async fn get_todo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Todo>> {
    Ok(Json(state.service.get_by_id(id)?.into()))
}

async fn update_todo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateTodo>,
) -> ApiResult<Json<Todo>> {
    let patch = TodoPatch {
        description: input.description,
        due_time: input.due_time,
    };
    let todo = state.service.update(id, patch)?;

    info!(
        id = %todo.id,
        description = ?todo.description,
        due_time = %todo.due_time,
        "updated todo"
    );

    Ok(Json(todo.into()))
}

async fn set_todo_description(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(description): Json<String>,
) -> ApiResult<Json<Todo>> {
    let todo = state.service.update_description(id, description)?;

    info!(
        id = %todo.id,
        description = ?todo.description,
        "updated todo description"
    );

    Ok(Json(todo.into()))
}

async fn set_todo_due_time(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(due_time): Json<DateTime<Utc>>,
) -> ApiResult<Json<Todo>> {
    let todo = state.service.update_due_time(id, due_time)?;

    info!(
        id = %todo.id,
        due_time = %todo.due_time,
        "updated todo due time"
    );

    Ok(Json(todo.into()))
}

async fn mark_todo_done(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Todo>> {
    let todo = state.service.mark_done(id)?;

    info!(id = %todo.id, status = ?todo.status, "updated todo status");

    Ok(Json(todo.into()))
}

async fn mark_todo_not_done(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Todo>> {
    let todo = state.service.mark_not_done(id)?;

    info!(id = %todo.id, status = ?todo.status, "updated todo status");

    Ok(Json(todo.into()))
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = match kind {
            ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorKind::InvalidState => StatusCode::CONFLICT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal => {
                error!("request failed: {:?}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorBody {
            kind,
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
