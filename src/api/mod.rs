pub mod memos;
pub mod pages;
mod state;
pub mod tasks;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use std::path::Path;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use memos::MemoError;
pub use state::AppState;
pub use tasks::{TaskError, TaskStatus};

pub const HEALTH_MESSAGE: &str = "메모장 + TODO 리스트 서비스가 정상 작동 중입니다.";

pub fn create_router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .merge(memos::create_router())
        .merge(tasks::create_router())
        .route("/", get(pages::dashboard))
        .route("/health", get(health))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": HEALTH_MESSAGE,
    }))
}
