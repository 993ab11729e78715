pub mod api;
pub mod client;
pub mod clock;
pub mod config;
pub mod memos;
pub mod storage;
pub mod tasks;
pub const BASE_URL: &str = "http://localhost:8000";
pub const MEMOS_API: &str = "api/memos";
pub const TODOS_API: &str = "api/todos";
pub const MEMOS_FILE: &str = "memos.json";
pub const TODOS_FILE: &str = "todos.json";
