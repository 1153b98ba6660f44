use crate::coordinator::TimerCoordinator;
use crate::domain::{Clock, TaskMap, TaskRecord};
use crate::error::{SyncError, TimerError, TrackerError};
use crate::notifications::{Notice, UiEvent};
use crate::persistence::{BlobStore, Config};
use crate::tracker::TrackerService;
use tracing::{error, info};

/// Tasks with less tracked time than this are not sent
pub const MIN_TIME_TO_SEND_MS: u64 = 1_000;

/// Comment attached to worklogs sent in bulk
pub const BATCH_COMMENT: &str = "Time worked on task";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub min_send_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            min_send_ms: MIN_TIME_TO_SEND_MS,
        }
    }
}

impl From<&Config> for SyncSettings {
    fn from(config: &Config) -> Self {
        Self {
            min_send_ms: config.min_send_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub inserted: usize,
    pub patched: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent { elapsed_ms: u64 },
    /// Below the minimum; nothing was sent
    NothingToSend { elapsed_ms: u64 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub sent: usize,
    pub failed: usize,
}

fn log_service_error(context: &str, err: &TrackerError) {
    match err.detail() {
        Some(detail) => error!(error = %err, detail = %detail, "{}", context),
        None => error!(error = %err, "{}", context),
    }
}

/// Pull the user's tasks and cache the ones not known yet.
/// Known tasks keep their timers; a missing tracker id is filled in.
pub fn fetch_tasks<B: BlobStore, C: Clock, S: TrackerService>(
    coordinator: &mut TimerCoordinator<B, C>,
    service: &mut S,
) -> Result<FetchSummary, SyncError> {
    let remote = match service.get_tasks() {
        Ok(tasks) => tasks,
        Err(err) => {
            log_service_error("error fetching tasks", &err);
            coordinator.notice(Notice::error("Error fetching tasks"));
            return Err(err.into());
        }
    };
    if remote.is_empty() {
        info!("no tasks found");
        return Ok(FetchSummary::default());
    }

    let stored = coordinator.store().get_all()?;
    let mut summary = FetchSummary::default();
    let mut new_tasks = TaskMap::new();

    for task in remote {
        match stored.get(&task.key) {
            None => {
                new_tasks.insert(task.key.clone(), TaskRecord::new(task.key, Some(task.id)));
            }
            Some(existing) if existing.task_id.is_none() => {
                if coordinator.store_mut().set_task_id(&task.key, &task.id)? {
                    summary.patched += 1;
                    coordinator.emit(UiEvent::TaskChanged(task.key));
                }
            }
            Some(_) => {}
        }
    }

    if !new_tasks.is_empty() {
        summary.inserted = coordinator.store_mut().merge(new_tasks)?;
        coordinator.emit(UiEvent::TasksChanged);
    }
    info!(inserted = summary.inserted, patched = summary.patched, "tasks fetched");
    Ok(summary)
}

/// Zero a task's timer after its time reached the tracker
fn reset_after_send<B: BlobStore, C: Clock>(
    coordinator: &mut TimerCoordinator<B, C>,
    record: &TaskRecord,
) -> Result<(), TimerError> {
    if coordinator.running_key() == Some(record.key.as_str()) {
        coordinator.stop()?;
    }
    coordinator.replace_state(&record.key, record.state.reset())?;
    Ok(())
}

/// Send one task's tracked time as a worklog and reset its timer.
/// On failure the tracked time is kept.
pub fn send_time_for_task<B: BlobStore, C: Clock, S: TrackerService>(
    coordinator: &mut TimerCoordinator<B, C>,
    service: &mut S,
    settings: SyncSettings,
    key: &str,
    comment: Option<&str>,
) -> Result<SendOutcome, SyncError> {
    let key = key.trim();
    if key.is_empty() {
        error!("attempt to send time for task without key");
        coordinator.notice(Notice::error("Error: task key not specified"));
        return Err(TimerError::EmptyTaskKey.into());
    }
    let Some(record) = coordinator.store().get(key)? else {
        error!(task = key, "attempt to send time for unknown task");
        coordinator.notice(Notice::error("Error: task not found"));
        return Err(TimerError::TaskNotFound(key.to_string()).into());
    };

    let elapsed_ms = record.state.elapsed(coordinator.now());
    if elapsed_ms < settings.min_send_ms {
        coordinator.notice(Notice::warning(format!("No time to send for task {}", key)));
        return Ok(SendOutcome::NothingToSend { elapsed_ms });
    }

    if let Err(err) = service.add_worklog(record.remote_id(), elapsed_ms, None, comment) {
        log_service_error(&format!("error sending time for task {}", key), &err);
        coordinator.notice(Notice::error(format!("Error sending time: {}", err)));
        return Err(err.into());
    }

    reset_after_send(coordinator, &record)?;
    info!(task = key, elapsed_ms, "time sent");
    coordinator.notice(Notice::info(format!("Time sent for task {}", key)));
    Ok(SendOutcome::Sent { elapsed_ms })
}

/// Send every task with enough tracked time. One task failing never stops
/// the rest; the summary counts both sides.
pub fn send_time_for_all_tasks<B: BlobStore, C: Clock, S: TrackerService>(
    coordinator: &mut TimerCoordinator<B, C>,
    service: &mut S,
    settings: SyncSettings,
    comment: Option<&str>,
) -> Result<BatchSummary, SyncError> {
    let now = coordinator.now();
    let pending: Vec<(TaskRecord, u64)> = coordinator
        .store()
        .get_all()?
        .into_values()
        .map(|record| {
            let elapsed = record.state.elapsed(now);
            (record, elapsed)
        })
        .filter(|(_, elapsed)| *elapsed >= settings.min_send_ms)
        .collect();

    if pending.is_empty() {
        coordinator.notice(Notice::warning("No tasks with accumulated time to send"));
        return Ok(BatchSummary::default());
    }

    let comment = comment.unwrap_or(BATCH_COMMENT);
    let mut summary = BatchSummary::default();
    for (record, elapsed_ms) in pending {
        let result = service
            .add_worklog(record.remote_id(), elapsed_ms, None, Some(comment))
            .map_err(SyncError::from)
            .and_then(|_| reset_after_send(coordinator, &record).map_err(SyncError::from));

        match result {
            Ok(()) => {
                summary.sent += 1;
                info!(task = %record.key, elapsed_ms, "time sent");
            }
            Err(SyncError::Tracker(err)) => {
                summary.failed += 1;
                log_service_error(&format!("error sending time for task {}", record.key), &err);
            }
            Err(err) => {
                summary.failed += 1;
                error!(task = %record.key, error = %err, "time sent but timer reset failed");
            }
        }
    }

    if summary.failed == 0 {
        coordinator.notice(Notice::info(format!(
            "Time successfully sent for {} tasks",
            summary.sent
        )));
    } else {
        coordinator.notice(Notice::warning(format!(
            "Sent for {} tasks, errors: {}",
            summary.sent, summary.failed
        )));
    }
    Ok(summary)
}

/// Stop timing and forget every cached task
pub fn clear_all_data<B: BlobStore, C: Clock>(
    coordinator: &mut TimerCoordinator<B, C>,
) -> Result<(), TimerError> {
    if coordinator.is_running() {
        coordinator.stop()?;
    }
    coordinator.store_mut().clear()?;
    coordinator.deselect();
    coordinator.emit(UiEvent::TasksChanged);
    coordinator.notice(Notice::info("All data cleared"));
    info!("all data cleared");
    Ok(())
}
