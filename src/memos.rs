use crate::clock::Clock;
use crate::storage::{JsonCollection, Patch, StoreError};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memo {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Memo {
    /// `needle` must already be lowercase.
    fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.content.to_lowercase().contains(needle)
            || self
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(needle))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMemo {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Fields to overwrite on an existing memo. Omitted fields are kept.
///
/// `title` and `content` can't be cleared, so `null` is treated like an
/// omitted field. `tags: null` empties the tag list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMemo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub tags: Patch<Vec<String>>,
}

pub struct MemoStore {
    collection: JsonCollection<Memo>,
    clock: Arc<dyn Clock>,
}

impl MemoStore {
    pub async fn open(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        Ok(Self {
            collection: JsonCollection::open(path).await?,
            clock,
        })
    }

    /// All memos in insertion order.
    pub async fn get_all(&self) -> Vec<Memo> {
        self.collection.load().await
    }

    pub async fn get_by_id(&self, id: &str) -> Option<Memo> {
        self.collection
            .load()
            .await
            .into_iter()
            .find(|memo| memo.id == id)
    }

    pub async fn create(&self, new_memo: NewMemo) -> Result<Memo, StoreError> {
        let now = self.clock.now();
        let memo = Memo {
            id: Uuid::new_v4().to_string(),
            title: new_memo.title,
            content: new_memo.content,
            tags: new_memo.tags.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        self.collection
            .modify(|memos| {
                memos.push(memo.clone());
                Some(())
            })
            .await?;

        info!("Created memo {}", memo.id);
        Ok(memo)
    }

    /// Applies `changes` to the memo with `id`. Returns `None` if there is no such memo.
    pub async fn update(&self, id: &str, changes: UpdateMemo) -> Result<Option<Memo>, StoreError> {
        let now = self.clock.now();

        self.collection
            .modify(|memos| {
                let memo = memos.iter_mut().find(|memo| memo.id == id)?;

                if let Some(title) = changes.title {
                    memo.title = title;
                }
                if let Some(content) = changes.content {
                    memo.content = content;
                }
                match changes.tags {
                    Patch::Absent => {}
                    Patch::Null => memo.tags.clear(),
                    Patch::Value(tags) => memo.tags = tags,
                }
                memo.updated_at = now;

                Some(memo.clone())
            })
            .await
    }

    /// Removes the memo with `id`, returning whether one was removed.
    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let removed = self
            .collection
            .modify(|memos| {
                let before = memos.len();
                memos.retain(|memo| memo.id != id);
                (memos.len() < before).then_some(())
            })
            .await?
            .is_some();

        if removed {
            info!("Deleted memo {}", id);
        }
        Ok(removed)
    }

    /// Case-insensitive substring search over title, content and tags.
    pub async fn search(&self, query: &str) -> Vec<Memo> {
        let needle = query.to_lowercase();
        self.collection
            .load()
            .await
            .into_iter()
            .filter(|memo| memo.matches(&needle))
            .collect()
    }
}
