use crate::clock::Clock;
use crate::storage::{JsonCollection, Patch, StoreError};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub const EXPIRED: &str = "만료됨";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_time: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Task {
    /// The deadline, if the task has a due date. A missing or unparseable
    /// `due_time` means midnight at the start of `due_date`.
    pub fn deadline(&self) -> Option<NaiveDateTime> {
        let date = self.due_date?;
        let time = self
            .due_time
            .as_deref()
            .and_then(parse_due_time)
            .unwrap_or(NaiveTime::MIN);
        Some(date.and_time(time))
    }

    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        match self.deadline() {
            Some(deadline) => now > deadline && !self.completed,
            None => false,
        }
    }

    /// Human readable time left until the deadline, or [`EXPIRED`] once it
    /// has passed. `None` for tasks without a due date and completed tasks.
    pub fn time_remaining(&self, now: NaiveDateTime) -> Option<String> {
        if self.completed {
            return None;
        }
        let deadline = self.deadline()?;
        if now > deadline {
            return Some(EXPIRED.to_string());
        }

        let total_minutes = (deadline - now).num_seconds() / 60;
        let days = total_minutes / (24 * 60);
        let hours = total_minutes % (24 * 60) / 60;
        let minutes = total_minutes % 60;

        let remaining = if days > 0 {
            format!("{days}일 {hours}시간 남음")
        } else if hours > 0 {
            format!("{hours}시간 {minutes}분 남음")
        } else {
            format!("{minutes}분 남음")
        };
        Some(remaining)
    }
}

/// Parses `"H"` or `"H:M"`. Anything else, including out of range values,
/// gives `None`.
fn parse_due_time(raw: &str) -> Option<NaiveTime> {
    let mut parts = raw.trim().split(':');
    let hour = parts.next()?.trim().parse::<u32>().ok()?;
    let minute = match parts.next() {
        Some(minute) => minute.trim().parse::<u32>().ok()?,
        None => 0,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// A task together with the fields derived from the clock at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub is_overdue: bool,
    pub time_remaining: Option<String>,
}

impl TaskView {
    pub fn new(task: Task, now: NaiveDateTime) -> Self {
        Self {
            is_overdue: task.is_overdue(now),
            time_remaining: task.time_remaining(now),
            task,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_time: Option<String>,
}

/// Fields to overwrite on an existing task. Omitted fields are kept, and an
/// explicit `null` clears `description`, `due_date` or `due_time`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub description: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub due_date: Patch<NaiveDate>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub due_time: Patch<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

pub struct TaskStore {
    collection: JsonCollection<Task>,
    clock: Arc<dyn Clock>,
}

impl TaskStore {
    pub async fn open(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        Ok(Self {
            collection: JsonCollection::open(path).await?,
            clock,
        })
    }

    /// Wraps tasks with their derived fields as of now.
    pub fn view_all(&self, tasks: Vec<Task>) -> Vec<TaskView> {
        let now = self.clock.now();
        tasks
            .into_iter()
            .map(|task| TaskView::new(task, now))
            .collect()
    }

    pub fn view(&self, task: Task) -> TaskView {
        TaskView::new(task, self.clock.now())
    }

    pub async fn get_all(&self) -> Vec<Task> {
        self.collection.load().await
    }

    pub async fn get_by_id(&self, id: &str) -> Option<Task> {
        self.collection
            .load()
            .await
            .into_iter()
            .find(|task| task.id == id)
    }

    pub async fn create(&self, new_task: NewTask) -> Result<Task, StoreError> {
        let now = self.clock.now();
        let task = Task {
            id: Uuid::new_v4().to_string(),
            title: new_task.title,
            description: new_task.description,
            due_date: new_task.due_date,
            due_time: new_task.due_time,
            completed: false,
            created_at: now,
            updated_at: now,
        };

        self.collection
            .modify(|tasks| {
                tasks.push(task.clone());
                Some(())
            })
            .await?;

        info!("Created task {}", task.id);
        Ok(task)
    }

    pub async fn update(&self, id: &str, changes: UpdateTask) -> Result<Option<Task>, StoreError> {
        let now = self.clock.now();

        self.collection
            .modify(|tasks| {
                let task = tasks.iter_mut().find(|task| task.id == id)?;

                if let Some(title) = changes.title {
                    task.title = title;
                }
                changes.description.apply_to(&mut task.description);
                changes.due_date.apply_to(&mut task.due_date);
                changes.due_time.apply_to(&mut task.due_time);
                if let Some(completed) = changes.completed {
                    task.completed = completed;
                }
                task.updated_at = now;

                Some(task.clone())
            })
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let removed = self
            .collection
            .modify(|tasks| {
                let before = tasks.len();
                tasks.retain(|task| task.id != id);
                (tasks.len() < before).then_some(())
            })
            .await?
            .is_some();

        if removed {
            info!("Deleted task {}", id);
        }
        Ok(removed)
    }

    /// Flips `completed` on the task with `id`.
    pub async fn toggle(&self, id: &str) -> Result<Option<Task>, StoreError> {
        let now = self.clock.now();

        self.collection
            .modify(|tasks| {
                let task = tasks.iter_mut().find(|task| task.id == id)?;
                task.completed = !task.completed;
                task.updated_at = now;
                Some(task.clone())
            })
            .await
    }

    pub async fn filter_by_status(&self, completed: bool) -> Vec<Task> {
        self.collection
            .load()
            .await
            .into_iter()
            .filter(|task| task.completed == completed)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::Duration;
    use tempfile::TempDir;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn task_due(due_date: Option<NaiveDate>, due_time: Option<&str>, completed: bool) -> Task {
        let created = at(2025, 1, 1, 0, 0);
        Task {
            id: "t".to_string(),
            title: "task".to_string(),
            description: None,
            due_date,
            due_time: due_time.map(str::to_string),
            completed,
            created_at: created,
            updated_at: created,
        }
    }

    struct TestStore {
        _dir: TempDir,
        clock: Arc<FixedClock>,
        store: TaskStore,
    }

    async fn setup_test_store() -> TestStore {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let clock = Arc::new(FixedClock::new(at(2025, 3, 10, 9, 0)));
        let store = TaskStore::open(dir.path().join("todos.json"), clock.clone())
            .await
            .expect("Failed to open task store");
        TestStore {
            _dir: dir,
            clock,
            store,
        }
    }

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: None,
            due_date: None,
            due_time: None,
        }
    }

    #[test]
    fn test_parse_due_time() {
        assert_eq!(parse_due_time("14:30"), NaiveTime::from_hms_opt(14, 30, 0));
        assert_eq!(parse_due_time("9"), NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(parse_due_time(" 07:05 "), NaiveTime::from_hms_opt(7, 5, 0));
        assert_eq!(parse_due_time("25:00"), None);
        assert_eq!(parse_due_time("12:60"), None);
        assert_eq!(parse_due_time("noon"), None);
        assert_eq!(parse_due_time("12:xx"), None);
        assert_eq!(parse_due_time(""), None);
    }

    #[test]
    fn test_no_due_date() {
        let now = at(2025, 3, 10, 9, 0);
        let task = task_due(None, Some("10:00"), false);

        assert_eq!(task.deadline(), None);
        assert!(!task.is_overdue(now));
        assert_eq!(task.time_remaining(now), None);
    }

    #[test]
    fn test_due_yesterday_is_overdue() {
        let now = at(2025, 3, 10, 9, 0);
        let task = task_due(NaiveDate::from_ymd_opt(2025, 3, 9), None, false);

        assert!(task.is_overdue(now));
        assert_eq!(task.time_remaining(now).as_deref(), Some(EXPIRED));
    }

    #[test]
    fn test_due_later_today_in_hours() {
        let now = at(2025, 3, 10, 0, 30);
        let task = task_due(NaiveDate::from_ymd_opt(2025, 3, 10), Some("23:30"), false);

        assert!(!task.is_overdue(now));
        assert_eq!(task.time_remaining(now).as_deref(), Some("23시간 0분 남음"));
    }

    #[test]
    fn test_time_remaining_buckets() {
        let now = at(2025, 3, 10, 9, 0);
        let due = NaiveDate::from_ymd_opt(2025, 3, 12);

        let days = task_due(due, Some("13:15"), false);
        assert_eq!(days.time_remaining(now).as_deref(), Some("2일 4시간 남음"));

        let minutes = task_due(NaiveDate::from_ymd_opt(2025, 3, 10), Some("9:45"), false);
        assert_eq!(minutes.time_remaining(now).as_deref(), Some("45분 남음"));

        let exactly_now = task_due(NaiveDate::from_ymd_opt(2025, 3, 10), Some("09:00"), false);
        assert!(!exactly_now.is_overdue(now));
        assert_eq!(exactly_now.time_remaining(now).as_deref(), Some("0분 남음"));
    }

    #[test]
    fn test_seconds_are_truncated() {
        let now = at(2025, 3, 10, 9, 0) + Duration::seconds(30);
        let task = task_due(NaiveDate::from_ymd_opt(2025, 3, 10), Some("10:00"), false);

        assert_eq!(task.time_remaining(now).as_deref(), Some("59분 남음"));
    }

    #[test]
    fn test_malformed_due_time_means_midnight() {
        let now = at(2025, 3, 10, 9, 0);
        let task = task_due(NaiveDate::from_ymd_opt(2025, 3, 10), Some("later"), false);

        assert_eq!(task.deadline(), Some(at(2025, 3, 10, 0, 0)));
        assert!(task.is_overdue(now));
        assert_eq!(task.time_remaining(now).as_deref(), Some(EXPIRED));
    }

    #[test]
    fn test_completed_task_has_no_time_remaining() {
        let now = at(2025, 3, 10, 9, 0);
        for due in [NaiveDate::from_ymd_opt(2025, 3, 9), NaiveDate::from_ymd_opt(2025, 3, 11)] {
            let task = task_due(due, None, true);
            assert!(!task.is_overdue(now));
            assert_eq!(task.time_remaining(now), None);
        }
    }

    #[test]
    fn test_view_serializes_derived_fields() {
        let now = at(2025, 3, 10, 9, 0);
        let view = TaskView::new(task_due(NaiveDate::from_ymd_opt(2025, 3, 9), None, false), now);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["is_overdue"], true);
        assert_eq!(json["time_remaining"], EXPIRED);
        assert_eq!(json["due_date"], "2025-03-09");
        assert_eq!(json["description"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_create_and_get_task() {
        let t = setup_test_store().await;

        let created = t
            .store
            .create(NewTask {
                title: "Write report".to_string(),
                description: Some("quarterly".to_string()),
                due_date: NaiveDate::from_ymd_opt(2025, 3, 11),
                due_time: Some("18:00".to_string()),
            })
            .await
            .expect("Failed to create task");

        assert!(!created.completed);
        assert_eq!(created.created_at, t.clock.now());

        let found = t.store.get_by_id(&created.id).await.expect("Task not found");
        assert_eq!(found, created);
        assert!(t.store.get_by_id("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_partial_update() {
        let t = setup_test_store().await;
        let created = t
            .store
            .create(NewTask {
                title: "title".to_string(),
                description: Some("desc".to_string()),
                due_date: NaiveDate::from_ymd_opt(2025, 3, 11),
                due_time: Some("08:00".to_string()),
            })
            .await
            .unwrap();

        t.clock.advance(Duration::hours(1));
        let updated = t
            .store
            .update(
                &created.id,
                UpdateTask {
                    title: Some("x".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .expect("Task not found");

        assert_eq!(updated.title, "x");
        assert_eq!(updated.description, created.description);
        assert_eq!(updated.due_date, created.due_date);
        assert_eq!(updated.due_time, created.due_time);
        assert_eq!(updated.completed, created.completed);
        assert_eq!(updated.updated_at, created.updated_at + Duration::hours(1));

        let changes: UpdateTask =
            serde_json::from_str(r#"{"due_date": null, "due_time": null, "completed": true}"#)
                .unwrap();
        let cleared = t.store.update(&created.id, changes).await.unwrap().unwrap();

        assert_eq!(cleared.description.as_deref(), Some("desc"));
        assert_eq!(cleared.due_date, None);
        assert_eq!(cleared.due_time, None);
        assert!(cleared.completed);

        assert!(t
            .store
            .update("missing", UpdateTask::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_completed() {
        let t = setup_test_store().await;
        let created = t.store.create(new_task("toggle me")).await.unwrap();

        t.clock.advance(Duration::minutes(1));
        let once = t.store.toggle(&created.id).await.unwrap().unwrap();
        assert!(once.completed);
        assert_eq!(once.updated_at, created.updated_at + Duration::minutes(1));

        t.clock.advance(Duration::minutes(1));
        let twice = t.store.toggle(&created.id).await.unwrap().unwrap();
        assert!(!twice.completed);
        assert_eq!(twice.updated_at, created.updated_at + Duration::minutes(2));
        assert_eq!(twice.title, created.title);

        assert!(t.store.toggle("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_filter_by_status_partitions() {
        let t = setup_test_store().await;
        let mut ids = Vec::new();
        for title in ["a", "b", "c", "d"] {
            ids.push(t.store.create(new_task(title)).await.unwrap().id);
        }
        t.store.toggle(&ids[1]).await.unwrap();
        t.store.toggle(&ids[3]).await.unwrap();

        let done = t.store.filter_by_status(true).await;
        let pending = t.store.filter_by_status(false).await;
        let all = t.store.get_all().await;

        assert_eq!(done.len() + pending.len(), all.len());
        assert!(done.iter().all(|task| task.completed));
        assert!(pending.iter().all(|task| !task.completed));
        assert!(done.iter().all(|task| !pending.contains(task)));

        let done_titles: Vec<&str> = done.iter().map(|task| task.title.as_str()).collect();
        assert_eq!(done_titles, vec!["b", "d"]);
    }

    #[tokio::test]
    async fn test_delete_task() {
        let t = setup_test_store().await;
        let created = t.store.create(new_task("bye")).await.unwrap();

        assert!(!t.store.delete("nonexistent").await.unwrap());
        assert_eq!(t.store.get_all().await.len(), 1);

        assert!(t.store.delete(&created.id).await.unwrap());
        assert!(t.store.get_all().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_are_all_kept() {
        let t = setup_test_store().await;
        let store = Arc::new(t.store);

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.create(new_task(&format!("task {i}"))).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let tasks = store.get_all().await;
        assert_eq!(tasks.len(), 50);
        let mut ids: Vec<_> = tasks.iter().map(|task| task.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 50);
    }

    #[tokio::test]
    async fn test_views_use_store_clock() {
        let t = setup_test_store().await;
        t.store
            .create(NewTask {
                due_date: NaiveDate::from_ymd_opt(2025, 3, 10),
                due_time: Some("10:00".to_string()),
                ..new_task("soon")
            })
            .await
            .unwrap();

        let before = t.store.view_all(t.store.get_all().await);
        assert_eq!(before[0].time_remaining.as_deref(), Some("1시간 0분 남음"));
        assert!(!before[0].is_overdue);

        t.clock.advance(Duration::hours(2));
        let after = t.store.view_all(t.store.get_all().await);
        assert_eq!(after[0].time_remaining.as_deref(), Some(EXPIRED));
        assert!(after[0].is_overdue);
    }
}
