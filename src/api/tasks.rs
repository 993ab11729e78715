use super::AppState;
pub use crate::tasks::{NewTask, Task, TaskView, UpdateTask};
use crate::storage::StoreError;
use crate::TODOS_API;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use axum_extra::response::ErasedJson;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Storage error: {0}")]
    StoreError(#[from] StoreError),

    #[error("Todo not found")]
    NotFound,

    #[error("Invalid status. Use 'completed' or 'pending'")]
    InvalidStatus,
}

impl IntoResponse for TaskError {
    fn into_response(self) -> Response {
        let status_code = match &self {
            TaskError::StoreError(e) => {
                error!("Task storage failure: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            TaskError::NotFound => StatusCode::NOT_FOUND,
            TaskError::InvalidStatus => StatusCode::BAD_REQUEST,
        };

        (status_code, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Completed,
    Pending,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Completed => "completed",
            TaskStatus::Pending => "pending",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }
}

impl FromStr for TaskStatus {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "completed" => Ok(TaskStatus::Completed),
            "pending" => Ok(TaskStatus::Pending),
            _ => Err(TaskError::InvalidStatus),
        }
    }
}

#[derive(Deserialize, Serialize, Default)]
pub struct FilterQuery {
    pub status: Option<String>,
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(
            format!("/{TODOS_API}").as_str(),
            get(list_tasks).post(create_task),
        )
        .route(
            format!("/{TODOS_API}/").as_str(),
            get(list_tasks).post(create_task),
        )
        .route(format!("/{TODOS_API}/filter").as_str(), get(filter_tasks))
        .route(format!("/{TODOS_API}/filter/").as_str(), get(filter_tasks))
        .route(
            format!("/{TODOS_API}/:id").as_str(),
            get(get_task).put(update_task).delete(delete_task),
        )
        .route(
            format!("/{TODOS_API}/:id/toggle").as_str(),
            patch(toggle_task),
        )
}

async fn list_tasks(State(state): State<AppState>) -> ErasedJson {
    let tasks = state.tasks.get_all().await;
    ErasedJson::pretty(state.tasks.view_all(tasks))
}

async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskView>, TaskError> {
    let task = state
        .tasks
        .get_by_id(&task_id)
        .await
        .ok_or(TaskError::NotFound)?;

    Ok(Json(state.tasks.view(task)))
}

async fn create_task(
    State(state): State<AppState>,
    Json(payload): Json<NewTask>,
) -> Result<Json<TaskView>, TaskError> {
    let task = state.tasks.create(payload).await?;
    Ok(Json(state.tasks.view(task)))
}

async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Json(payload): Json<UpdateTask>,
) -> Result<Json<TaskView>, TaskError> {
    let task = state
        .tasks
        .update(&task_id, payload)
        .await?
        .ok_or(TaskError::NotFound)?;

    Ok(Json(state.tasks.view(task)))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<Value>, TaskError> {
    if state.tasks.delete(&task_id).await? {
        Ok(Json(json!({ "message": "Todo deleted successfully" })))
    } else {
        Err(TaskError::NotFound)
    }
}

async fn toggle_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskView>, TaskError> {
    let task = state
        .tasks
        .toggle(&task_id)
        .await?
        .ok_or(TaskError::NotFound)?;

    Ok(Json(state.tasks.view(task)))
}

async fn filter_tasks(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Vec<TaskView>>, TaskError> {
    let tasks = match query.status {
        Some(status) => {
            let status: TaskStatus = status.parse()?;
            state.tasks.filter_by_status(status.is_completed()).await
        }
        None => state.tasks.get_all().await,
    };

    Ok(Json(state.tasks.view_all(tasks)))
}
