use super::AppState;
pub use crate::memos::{Memo, NewMemo, UpdateMemo};
use crate::storage::StoreError;
use crate::MEMOS_API;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use axum_extra::response::ErasedJson;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum MemoError {
    #[error("Storage error: {0}")]
    StoreError(#[from] StoreError),

    #[error("Memo not found")]
    NotFound,

    #[error("Search query is required")]
    MissingQuery,
}

impl IntoResponse for MemoError {
    fn into_response(self) -> Response {
        let status_code = match &self {
            MemoError::StoreError(e) => {
                error!("Memo storage failure: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            MemoError::NotFound => StatusCode::NOT_FOUND,
            MemoError::MissingQuery => StatusCode::BAD_REQUEST,
        };

        (status_code, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[derive(Deserialize, Serialize, Default)]
pub struct SearchQuery {
    pub q: Option<String>,
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(
            format!("/{MEMOS_API}").as_str(),
            get(list_memos).post(create_memo),
        )
        .route(
            format!("/{MEMOS_API}/").as_str(),
            get(list_memos).post(create_memo),
        )
        .route(format!("/{MEMOS_API}/search").as_str(), get(search_memos))
        .route(format!("/{MEMOS_API}/search/").as_str(), get(search_memos))
        .route(
            format!("/{MEMOS_API}/:id").as_str(),
            get(get_memo).put(update_memo).delete(delete_memo),
        )
}

async fn list_memos(State(state): State<AppState>) -> ErasedJson {
    ErasedJson::pretty(state.memos.get_all().await)
}

async fn get_memo(
    State(state): State<AppState>,
    Path(memo_id): Path<String>,
) -> Result<Json<Memo>, MemoError> {
    state
        .memos
        .get_by_id(&memo_id)
        .await
        .map(Json)
        .ok_or(MemoError::NotFound)
}

async fn create_memo(
    State(state): State<AppState>,
    Json(payload): Json<NewMemo>,
) -> Result<Json<Memo>, MemoError> {
    let memo = state.memos.create(payload).await?;
    Ok(Json(memo))
}

async fn update_memo(
    State(state): State<AppState>,
    Path(memo_id): Path<String>,
    Json(payload): Json<UpdateMemo>,
) -> Result<Json<Memo>, MemoError> {
    state
        .memos
        .update(&memo_id, payload)
        .await?
        .map(Json)
        .ok_or(MemoError::NotFound)
}

async fn delete_memo(
    State(state): State<AppState>,
    Path(memo_id): Path<String>,
) -> Result<Json<Value>, MemoError> {
    if state.memos.delete(&memo_id).await? {
        Ok(Json(json!({ "message": "Memo deleted successfully" })))
    } else {
        Err(MemoError::NotFound)
    }
}

async fn search_memos(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Memo>>, MemoError> {
    let q = query
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or(MemoError::MissingQuery)?;

    Ok(Json(state.memos.search(&q).await))
}
