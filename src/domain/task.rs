use super::timer::TimerState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Every known task, keyed (and ordered) by task key
pub type TaskMap = BTreeMap<String, TaskRecord>;

/// A tracker task as cached locally, together with its timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredTask", into = "StoredTask")]
pub struct TaskRecord {
    /// Human-readable key, e.g. "PROJ-12"
    pub key: String,
    /// Tracker's internal id, when known
    pub task_id: Option<String>,
    /// Git branch bound to this task (empty when unbound)
    pub branch: String,
    pub state: TimerState,
}

impl TaskRecord {
    /// Newly fetched task: unbound, no time tracked
    pub fn new(key: impl Into<String>, task_id: Option<String>) -> Self {
        Self {
            key: key.into(),
            task_id,
            branch: String::new(),
            state: TimerState::new(),
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn with_state(mut self, state: TimerState) -> Self {
        self.state = state;
        self
    }

    /// Identifier to address this task on the tracker: id if known, else key
    pub fn remote_id(&self) -> &str {
        self.task_id.as_deref().unwrap_or(&self.key)
    }
}

/// On-disk shape: `{ "data": { "taskKey", "taskId", "branch" }, "state": {..} }`
#[derive(Serialize, Deserialize)]
struct StoredTask {
    data: StoredTaskData,
    #[serde(default)]
    state: TimerState,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTaskData {
    task_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    task_id: Option<String>,
    #[serde(default)]
    branch: String,
}

impl From<StoredTask> for TaskRecord {
    fn from(stored: StoredTask) -> Self {
        Self {
            key: stored.data.task_key,
            task_id: stored.data.task_id,
            branch: stored.data.branch,
            state: stored.state,
        }
    }
}

impl From<TaskRecord> for StoredTask {
    fn from(record: TaskRecord) -> Self {
        Self {
            data: StoredTaskData {
                task_key: record.key,
                task_id: record.task_id,
                branch: record.branch,
            },
            state: record.state,
        }
    }
}
