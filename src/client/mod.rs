pub mod memos;
pub mod tasks;
pub use crate::api::memos::{Memo, NewMemo, UpdateMemo};
pub use crate::api::tasks::{NewTask, TaskStatus, TaskView, UpdateTask};
// Re-export the modules
pub use memos::*;
pub use tasks::*;

/// Status line plus the server's `detail` message, or the raw body when it
/// isn't one of our JSON errors.
async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["detail"].as_str().map(str::to_string))
        .unwrap_or(body);
    format!("{status}: {detail}")
}
