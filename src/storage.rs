use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::marker::PhantomData;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A list of records persisted as one pretty-printed JSON array.
///
/// The file is the single source of truth: every read parses the whole file
/// and every mutation rewrites it. Mutations are serialized through a
/// per-file lock so two concurrent read-modify-write cycles can't drop each
/// other's changes.
pub struct JsonCollection<T> {
    path: PathBuf,
    write_lock: Mutex<()>,
    _records: PhantomData<fn() -> T>,
}

impl<T> JsonCollection<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Opens the collection at `path`, creating it as an empty array if needed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let collection = Self {
            path: path.into(),
            write_lock: Mutex::new(()),
            _records: PhantomData,
        };
        collection.ensure_storage().await?;
        Ok(collection)
    }

    /// Creates the parent directory and an empty-array file if they are missing.
    /// An existing file is left as it is.
    pub async fn ensure_storage(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        if !fs::try_exists(&self.path).await? {
            debug!("Creating empty collection at {}", self.path.display());
            fs::write(&self.path, b"[]").await?;
        }

        Ok(())
    }

    /// Reads every record in file order.
    ///
    /// A missing, unreadable or malformed file yields an empty list. Entries
    /// that don't decode as `T` are skipped.
    pub async fn load(&self) -> Vec<T> {
        self.read_entries().await.records
    }

    /// Runs one read-modify-write cycle.
    ///
    /// `mutate` gets the full list and returns `Some` when it changed it; only
    /// then is the list written back. The closure's result is passed through.
    /// Entries that couldn't be decoded are written back unchanged.
    pub async fn modify<R, F>(&self, mutate: F) -> Result<Option<R>, StoreError>
    where
        F: FnOnce(&mut Vec<T>) -> Option<R>,
    {
        let _guard = self.write_lock.lock().await;

        let Entries {
            mut records,
            undecoded,
        } = self.read_entries().await;
        let outcome = mutate(&mut records);
        if outcome.is_some() {
            self.save(&records, &undecoded).await.inspect_err(|e| {
                error!("Failed to write {}: {}", self.path.display(), e);
            })?;
        }

        Ok(outcome)
    }

    async fn read_entries(&self) -> Entries<T> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(
                    "Could not read {}, treating it as empty: {}",
                    self.path.display(),
                    e
                );
                return Entries::default();
            }
        };

        let values: Vec<Value> = match serde_json::from_slice(&bytes) {
            Ok(values) => values,
            Err(e) => {
                warn!(
                    "Malformed JSON in {}, treating it as empty: {}",
                    self.path.display(),
                    e
                );
                return Entries::default();
            }
        };

        let mut entries = Entries::default();
        for (index, value) in values.into_iter().enumerate() {
            match T::deserialize(&value) {
                Ok(record) => entries.records.push(record),
                Err(e) => {
                    warn!(
                        "Skipping entry {} in {}: {}",
                        index,
                        self.path.display(),
                        e
                    );
                    entries.undecoded.push((entries.records.len(), value));
                }
            }
        }
        entries
    }

    async fn save(&self, records: &[T], undecoded: &[(usize, Value)]) -> Result<(), StoreError> {
        // Undecoded entries go back after the same number of records that
        // preceded them when read
        let mut pending = undecoded.iter().peekable();
        let mut entries = Vec::with_capacity(records.len() + undecoded.len());
        for (position, record) in records.iter().enumerate() {
            while let Some((_, value)) = pending.next_if(|(before, _)| *before <= position) {
                entries.push(Entry::Raw(value));
            }
            entries.push(Entry::Record(record));
        }
        entries.extend(pending.map(|(_, value)| Entry::Raw(value)));

        let json = serde_json::to_vec_pretty(&entries)?;

        // Write beside the target and rename so readers never see a partial file
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, &json).await?;
        fs::rename(&tmp_path, &self.path).await?;

        Ok(())
    }
}

/// The contents of a collection file as last read.
///
/// `undecoded` holds entries that aren't valid `T`, each paired with the
/// number of decoded records that came before it.
struct Entries<T> {
    records: Vec<T>,
    undecoded: Vec<(usize, Value)>,
}

impl<T> Default for Entries<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            undecoded: Vec::new(),
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum Entry<'a, T> {
    Record(&'a T),
    Raw(&'a Value),
}

/// A field of a partial update.
///
/// Distinguishes a field left out of the request (`Absent`) from one sent as
/// JSON `null` (`Null`). Use with `#[serde(default)]` so omitted fields
/// deserialize as `Absent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    Absent,
    Null,
    Value(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Absent
    }
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    /// Writes the patch into an optional field: `Null` clears it, `Absent`
    /// leaves it alone.
    pub fn apply_to(self, target: &mut Option<T>) {
        match self {
            Patch::Absent => {}
            Patch::Null => *target = None,
            Patch::Value(value) => *target = Some(value),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Patch::Value(value),
            None => Patch::Null,
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Into::into)
    }
}

impl<T> Serialize for Patch<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Patch::Value(value) => serializer.serialize_some(value),
            Patch::Absent | Patch::Null => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Record {
        id: String,
        label: String,
    }

    fn record(id: &str, label: &str) -> Record {
        Record {
            id: id.to_string(),
            label: label.to_string(),
        }
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct PatchRequest {
        #[serde(default, skip_serializing_if = "Patch::is_absent")]
        description: Patch<String>,
    }

    #[tokio::test]
    async fn test_open_creates_directory_and_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("records.json");

        let collection = JsonCollection::<Record>::open(&path).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
        assert!(collection.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_open_keeps_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(&path, r#"[{"id": "1", "label": "kept"}]"#).unwrap();

        let collection = JsonCollection::<Record>::open(&path).await.unwrap();
        collection.ensure_storage().await.unwrap();

        assert_eq!(collection.load().await, vec![record("1", "kept")]);
    }

    #[tokio::test]
    async fn test_malformed_or_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.json");
        let collection = JsonCollection::<Record>::open(&path).await.unwrap();

        std::fs::write(&path, "{ not json").unwrap();
        assert!(collection.load().await.is_empty());

        std::fs::remove_file(&path).unwrap();
        assert!(collection.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_modify_saves_only_on_change() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.json");
        let collection = JsonCollection::<Record>::open(&path).await.unwrap();

        let added = collection
            .modify(|records| {
                records.push(record("1", "첫 번째"));
                Some(records.len())
            })
            .await
            .unwrap();
        assert_eq!(added, Some(1));

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\n  {\n    \"id\": \"1\""));
        assert!(written.contains("첫 번째"));
        assert!(!dir.path().join("records.json.tmp").exists());

        std::fs::write(&path, "garbage").unwrap();
        let untouched = collection
            .modify(|records| {
                records.push(record("2", "dropped"));
                None::<()>
            })
            .await
            .unwrap();
        assert_eq!(untouched, None);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "garbage");
    }

    #[tokio::test]
    async fn test_undecodable_entries_survive_a_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(
            &path,
            r#"[{"id": "1", "label": "keep"}, {"id": "2"}, {"id": "3", "label": "also"}]"#,
        )
        .unwrap();
        let collection = JsonCollection::<Record>::open(&path).await.unwrap();

        assert_eq!(
            collection.load().await,
            vec![record("1", "keep"), record("3", "also")]
        );

        collection
            .modify(|records| {
                records.push(record("4", "new"));
                Some(())
            })
            .await
            .unwrap();

        let written: Vec<serde_json::Value> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let ids: Vec<_> = written.iter().map(|entry| entry["id"].clone()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4"]);
        assert_eq!(written[1], serde_json::json!({ "id": "2" }));
        assert_eq!(collection.load().await.len(), 3);
    }

    #[test]
    fn test_patch_distinguishes_absent_null_and_value() {
        let absent: PatchRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.description, Patch::Absent);

        let null: PatchRequest = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(null.description, Patch::Null);

        let value: PatchRequest = serde_json::from_str(r#"{"description": "x"}"#).unwrap();
        assert_eq!(value.description, Patch::Value("x".to_string()));

        assert_eq!(
            serde_json::to_string(&PatchRequest::default()).unwrap(),
            "{}"
        );
        assert_eq!(serde_json::to_string(&null).unwrap(), r#"{"description":null}"#);
    }

    #[test]
    fn test_patch_apply_to() {
        let mut field = Some("old".to_string());

        Patch::Absent.apply_to(&mut field);
        assert_eq!(field.as_deref(), Some("old"));

        Patch::Value("new".to_string()).apply_to(&mut field);
        assert_eq!(field.as_deref(), Some("new"));

        Patch::Null.apply_to(&mut field);
        assert_eq!(field, None);
    }
}
