use super::enums::RunStatus;
use super::task::TaskMap;
use super::timer::format_elapsed;

/// A display row for one task in the list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub key: String,
    pub branch: String,
    pub elapsed_ms: u64,
    pub status: RunStatus,
}

impl TaskRow {
    pub fn elapsed_formatted(&self) -> String {
        format_elapsed(self.elapsed_ms)
    }
}

/// Rows for every task in key order, with elapsed time evaluated at `now`
pub fn task_rows(tasks: &TaskMap, now: i64) -> Vec<TaskRow> {
    tasks
        .values()
        .map(|record| TaskRow {
            key: record.key.clone(),
            branch: record.branch.clone(),
            elapsed_ms: record.state.elapsed(now),
            status: RunStatus::of(&record.state),
        })
        .collect()
}

/// Total tracked time across all tasks at `now`
pub fn total_elapsed(tasks: &TaskMap, now: i64) -> u64 {
    tasks.values().map(|record| record.state.elapsed(now)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TaskRecord, TimerState};
    use pretty_assertions::assert_eq;

    fn sample_tasks() -> TaskMap {
        let mut tasks = TaskMap::new();
        tasks.insert(
            "B-2".to_string(),
            TaskRecord::new("B-2", None).with_state(TimerState::running(1_000, 10_000)),
        );
        tasks.insert(
            "A-1".to_string(),
            TaskRecord::new("A-1", None)
                .with_branch("main")
                .with_state(TimerState::stopped(60_000)),
        );
        tasks
    }

    #[test]
    fn test_task_rows_are_key_ordered() {
        let rows = task_rows(&sample_tasks(), 12_000);
        assert_eq!(
            rows,
            vec![
                TaskRow {
                    key: "A-1".to_string(),
                    branch: "main".to_string(),
                    elapsed_ms: 60_000,
                    status: RunStatus::Stopped,
                },
                TaskRow {
                    key: "B-2".to_string(),
                    branch: String::new(),
                    elapsed_ms: 3_000,
                    status: RunStatus::Running,
                },
            ]
        );
        assert_eq!(rows[0].elapsed_formatted(), "0:01:00");
    }

    #[test]
    fn test_total_elapsed() {
        assert_eq!(total_elapsed(&sample_tasks(), 12_000), 63_000);
        assert_eq!(total_elapsed(&TaskMap::new(), 12_000), 0);
    }
}
