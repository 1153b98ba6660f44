use super::files::{atomic_write, read_file, remove_file};
use crate::domain::{TaskMap, TaskRecord, TimerState};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};

/// Key under which the whole task mapping is stored
pub const TASKS_KEY: &str = "tasks";

/// Keyed storage where each key holds one opaque value, read and written whole
pub trait BlobStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Blob store backed by `<dir>/<key>.json` files
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        read_file(self.path_for(key))
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        atomic_write(self.path_for(key), value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        remove_file(self.path_for(key))
    }
}

/// In-memory blob store for tests
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    values: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// Durable task-key → record mapping.
///
/// Every mutation reads the full mapping, changes it and writes it back in one
/// call. Mutations take `&mut self`, so two read-modify-write spans can never
/// interleave.
#[derive(Debug)]
pub struct TaskStore<B: BlobStore> {
    blob: B,
}

impl<B: BlobStore> TaskStore<B> {
    pub fn new(blob: B) -> Self {
        Self { blob }
    }

    fn read_map(&self) -> Result<TaskMap> {
        match self.blob.get(TASKS_KEY)? {
            Some(content) if !content.trim().is_empty() => {
                serde_json::from_str(&content).context("Failed to decode stored tasks")
            }
            _ => Ok(TaskMap::new()),
        }
    }

    fn write_map(&mut self, map: &TaskMap) -> Result<()> {
        let json = serde_json::to_string_pretty(map)?;
        self.blob.put(TASKS_KEY, &json)
    }

    /// All stored tasks
    pub fn get_all(&self) -> Result<TaskMap> {
        self.read_map()
    }

    pub fn get(&self, key: &str) -> Result<Option<TaskRecord>> {
        Ok(self.read_map()?.remove(key))
    }

    /// Insert records whose keys are not stored yet. Existing records are left
    /// untouched. Returns how many were inserted.
    pub fn merge(&mut self, records: TaskMap) -> Result<usize> {
        if records.is_empty() {
            warn!("merge called with no tasks");
            return Ok(0);
        }

        let mut map = self.read_map()?;
        let mut inserted = 0;
        for (key, record) in records {
            if !map.contains_key(&key) {
                map.insert(key, record);
                inserted += 1;
            }
        }

        if inserted > 0 {
            self.write_map(&map)?;
        }
        Ok(inserted)
    }

    /// Fill in the tracker id of an existing task
    pub fn set_task_id(&mut self, key: &str, task_id: &str) -> Result<bool> {
        let mut map = self.read_map()?;
        let Some(record) = map.get_mut(key) else {
            warn!(task = key, "task not found when setting task id");
            return Ok(false);
        };
        record.task_id = Some(task_id.to_string());
        self.write_map(&map)?;
        Ok(true)
    }

    /// Replace the timer of an existing task. Unknown keys are skipped.
    pub fn set_timer_state(&mut self, key: &str, state: TimerState) -> Result<bool> {
        let mut map = self.read_map()?;
        let Some(record) = map.get_mut(key) else {
            warn!(task = key, "task not found in storage when saving timer state");
            return Ok(false);
        };
        record.state = state;
        self.write_map(&map)?;
        Ok(true)
    }

    pub fn get_timer_state(&self, key: &str) -> Result<Option<TimerState>> {
        Ok(self.read_map()?.get(key).map(|record| record.state))
    }

    /// Bind a git branch to a task
    pub fn assign_branch(&mut self, key: &str, branch: &str) -> Result<bool> {
        if key.trim().is_empty() || branch.trim().is_empty() {
            warn!(task = key, branch, "invalid params for assign_branch");
            return Ok(false);
        }

        let mut map = self.read_map()?;
        let Some(record) = map.get_mut(key) else {
            warn!(task = key, "task not found when trying to assign branch");
            return Ok(false);
        };
        record.branch = branch.to_string();
        self.write_map(&map)?;
        info!(task = key, branch, "branch assigned to task");
        Ok(true)
    }

    /// First task (in key order) whose timer is running
    pub fn active_key(&self) -> Result<Option<String>> {
        Ok(self
            .read_map()?
            .into_values()
            .find(|record| record.state.is_running())
            .map(|record| record.key))
    }

    /// Every task whose timer is running
    pub fn running_keys(&self) -> Result<Vec<String>> {
        Ok(self
            .read_map()?
            .into_values()
            .filter(|record| record.state.is_running())
            .map(|record| record.key)
            .collect())
    }

    /// Keys of the tasks bound to `branch`
    pub fn keys_for_branch(&self, branch: &str) -> Result<Vec<String>> {
        Ok(self
            .read_map()?
            .into_values()
            .filter(|record| record.branch == branch)
            .map(|record| record.key)
            .collect())
    }

    /// Drop every stored task
    pub fn clear(&mut self) -> Result<()> {
        self.blob.remove(TASKS_KEY)?;
        info!("all tasks cleared from storage");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn memory_store() -> TaskStore<MemoryBlobStore> {
        TaskStore::new(MemoryBlobStore::default())
    }

    fn tasks(records: Vec<TaskRecord>) -> TaskMap {
        records
            .into_iter()
            .map(|record| (record.key.clone(), record))
            .collect()
    }

    #[test]
    fn test_empty_store() {
        let store = memory_store();
        assert!(store.get_all().unwrap().is_empty());
        assert_eq!(store.active_key().unwrap(), None);
        assert_eq!(store.get_timer_state("X-1").unwrap(), None);
    }

    #[test]
    fn test_merge_inserts_new_keys_only() {
        let mut store = memory_store();
        store
            .merge(tasks(vec![TaskRecord::new("A-1", None)
                .with_state(TimerState::stopped(5_000))]))
            .unwrap();

        let inserted = store
            .merge(tasks(vec![
                TaskRecord::new("A-1", Some("id-a".to_string())),
                TaskRecord::new("B-2", Some("id-b".to_string())),
            ]))
            .unwrap();
        assert_eq!(inserted, 1);

        let all = store.get_all().unwrap();
        assert_eq!(all.len(), 2);
        // existing record is not overwritten
        assert_eq!(all["A-1"].task_id, None);
        assert_eq!(all["A-1"].state, TimerState::stopped(5_000));
        assert_eq!(all["B-2"].task_id.as_deref(), Some("id-b"));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut store = memory_store();
        let payload = tasks(vec![TaskRecord::new("A-1", None), TaskRecord::new("B-2", None)]);

        assert_eq!(store.merge(payload.clone()).unwrap(), 2);
        let after_first = store.get_all().unwrap();

        assert_eq!(store.merge(payload).unwrap(), 0);
        assert_eq!(store.get_all().unwrap(), after_first);
    }

    #[test]
    fn test_merge_empty_is_noop() {
        let mut store = memory_store();
        assert_eq!(store.merge(TaskMap::new()).unwrap(), 0);
        assert!(store.get_all().unwrap().is_empty());
    }

    #[test]
    fn test_set_timer_state_requires_existing_key() {
        let mut store = memory_store();
        assert!(!store.set_timer_state("NOPE-1", TimerState::stopped(1)).unwrap());
        assert!(store.get_all().unwrap().is_empty());

        store.merge(tasks(vec![TaskRecord::new("A-1", None)])).unwrap();
        assert!(store.set_timer_state("A-1", TimerState::running(10, 20)).unwrap());
        assert_eq!(
            store.get_timer_state("A-1").unwrap(),
            Some(TimerState::running(10, 20))
        );
    }

    #[test]
    fn test_set_task_id() {
        let mut store = memory_store();
        store.merge(tasks(vec![TaskRecord::new("A-1", None)])).unwrap();

        assert!(store.set_task_id("A-1", "id-a").unwrap());
        assert!(!store.set_task_id("B-2", "id-b").unwrap());
        assert_eq!(store.get("A-1").unwrap().unwrap().task_id.as_deref(), Some("id-a"));
    }

    #[test]
    fn test_assign_branch() {
        let mut store = memory_store();
        store.merge(tasks(vec![TaskRecord::new("A-1", None)])).unwrap();

        assert!(!store.assign_branch("", "main").unwrap());
        assert!(!store.assign_branch("A-1", "").unwrap());
        assert!(!store.assign_branch("B-2", "main").unwrap());
        assert!(store.assign_branch("A-1", "feat/x").unwrap());

        assert_eq!(store.get("A-1").unwrap().unwrap().branch, "feat/x");
        assert_eq!(store.keys_for_branch("feat/x").unwrap(), vec!["A-1".to_string()]);
        assert!(store.keys_for_branch("main").unwrap().is_empty());
    }

    #[test]
    fn test_active_key_is_first_running() {
        let mut store = memory_store();
        store
            .merge(tasks(vec![
                TaskRecord::new("A-1", None),
                TaskRecord::new("B-2", None).with_state(TimerState::running(0, 100)),
                TaskRecord::new("C-3", None).with_state(TimerState::running(0, 50)),
            ]))
            .unwrap();

        assert_eq!(store.active_key().unwrap(), Some("B-2".to_string()));
        assert_eq!(
            store.running_keys().unwrap(),
            vec!["B-2".to_string(), "C-3".to_string()]
        );
    }

    #[test]
    fn test_clear() {
        let mut store = memory_store();
        store.merge(tasks(vec![TaskRecord::new("A-1", None)])).unwrap();
        store.clear().unwrap();
        assert!(store.get_all().unwrap().is_empty());
    }

    #[test]
    fn test_file_store_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = TaskStore::new(FileBlobStore::new(temp_dir.path()));
        store
            .merge(tasks(vec![TaskRecord::new("A-1", Some("1".to_string()))
                .with_branch("main")
                .with_state(TimerState::running(700, 1_000))]))
            .unwrap();

        assert!(temp_dir.path().join("tasks.json").exists());

        let reopened = TaskStore::new(FileBlobStore::new(temp_dir.path()));
        let all = reopened.get_all().unwrap();
        assert_eq!(all["A-1"].branch, "main");
        assert_eq!(all["A-1"].state, TimerState::running(700, 1_000));

        let mut reopened = reopened;
        reopened.clear().unwrap();
        assert!(!temp_dir.path().join("tasks.json").exists());
    }

    #[test]
    fn test_corrupt_blob_is_an_error() {
        let mut blob = MemoryBlobStore::default();
        blob.put(TASKS_KEY, "{ not json").unwrap();
        let store = TaskStore::new(blob);
        assert!(store.get_all().is_err());
    }
}
