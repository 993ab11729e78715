use crate::{MEMOS_FILE, TODOS_FILE};
use std::path::PathBuf;

pub const DATA_DIR_VAR: &str = "MEMO_TODO_DATA_DIR";
pub const STATIC_DIR_VAR: &str = "MEMO_TODO_STATIC_DIR";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_STATIC_DIR: &str = "static";

/// Where the server keeps its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
        }
    }
}

impl Config {
    /// Reads the environment (call `dotenv` first to pick up a `.env` file),
    /// falling back to defaults for unset variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            data_dir: lookup(DATA_DIR_VAR)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            static_dir: lookup(STATIC_DIR_VAR)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
        }
    }

    pub fn with_overrides(mut self, data_dir: Option<PathBuf>, static_dir: Option<PathBuf>) -> Self {
        if let Some(data_dir) = data_dir {
            self.data_dir = data_dir;
        }
        if let Some(static_dir) = static_dir {
            self.static_dir = static_dir;
        }
        self
    }

    pub fn memos_path(&self) -> PathBuf {
        self.data_dir.join(MEMOS_FILE)
    }

    pub fn todos_path(&self) -> PathBuf {
        self.data_dir.join(TODOS_FILE)
    }
}
