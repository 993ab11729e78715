use crate::clock::Clock;
use crate::config::Config;
use crate::memos::MemoStore;
use crate::storage::StoreError;
use crate::tasks::TaskStore;
use std::sync::Arc;

// Shared state
#[derive(Clone)]
pub struct AppState {
    pub memos: Arc<MemoStore>,
    pub tasks: Arc<TaskStore>,
}

impl AppState {
    /// Opens both stores under `config.data_dir`, creating their files if needed.
    pub async fn open(config: &Config, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        let memos = MemoStore::open(config.memos_path(), clock.clone()).await?;
        let tasks = TaskStore::open(config.todos_path(), clock).await?;
        Ok(Self {
            memos: Arc::new(memos),
            tasks: Arc::new(tasks),
        })
    }
}
