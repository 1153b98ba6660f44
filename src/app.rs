use crate::branch::{handle_branch_change, BranchOutcome};
use crate::coordinator::TimerCoordinator;
use crate::domain::{format_elapsed, task_rows, Clock, TaskRow};
use crate::error::TimerError;
use crate::git::BranchWatcher;
use crate::notifications::{self, Notice, UiEvent};
use crate::persistence::BlobStore;
use anyhow::Result;
use tracing::{error, warn};

/// State of the `watch` terminal view
pub struct AppState<B: BlobStore, C: Clock> {
    pub coordinator: TimerCoordinator<B, C>,
    pub watcher: Option<BranchWatcher>,
    pub rows: Vec<TaskRow>,
    pub selected_index: usize,
    /// Latest message from the core, shown under the list
    pub message: Option<Notice>,
}

impl<B: BlobStore, C: Clock> AppState<B, C> {
    pub fn new(coordinator: TimerCoordinator<B, C>, watcher: Option<BranchWatcher>) -> Self {
        let mut app = Self {
            coordinator,
            watcher,
            rows: Vec::new(),
            selected_index: 0,
            message: None,
        };
        if let Err(e) = app.refresh_rows() {
            error!(error = %e, "failed to load tasks");
            app.message = Some(Notice::error(format!("Failed to load tasks: {}", e)));
        }

        // Start with the cursor on the task being timed
        let focus = app
            .coordinator
            .running_key()
            .or(app.coordinator.active_key())
            .map(str::to_string);
        if let Some(index) = focus.and_then(|key| app.rows.iter().position(|row| row.key == key)) {
            app.selected_index = index;
        }
        app.apply_events();
        app
    }

    /// Re-read the task list from the store
    pub fn refresh_rows(&mut self) -> Result<()> {
        let tasks = self.coordinator.store().get_all()?;
        self.rows = task_rows(&tasks, self.coordinator.now());
        if self.selected_index >= self.rows.len() {
            self.selected_index = self.rows.len().saturating_sub(1);
        }
        Ok(())
    }

    pub fn selected_key(&self) -> Option<&str> {
        self.rows.get(self.selected_index).map(|row| row.key.as_str())
    }

    pub fn move_selection_up(&mut self) {
        if self.selected_index > 0 {
            self.selected_index -= 1;
            self.select_current();
        }
    }

    pub fn move_selection_down(&mut self) {
        if self.selected_index + 1 < self.rows.len() {
            self.selected_index += 1;
            self.select_current();
        }
    }

    fn select_current(&mut self) {
        if let Some(key) = self.selected_key().map(str::to_string) {
            if let Err(e) = self.coordinator.select_task(&key) {
                warn!(error = %e, "failed to select task");
            }
        }
    }

    /// Start the highlighted task, or stop it if it is the one being timed
    pub fn toggle_timer(&mut self) -> Result<(), TimerError> {
        let Some(key) = self.selected_key().map(str::to_string) else {
            return Ok(());
        };
        if self.coordinator.running_key() == Some(key.as_str()) {
            self.coordinator.stop()?;
        } else {
            self.coordinator.select_task(&key)?;
            self.coordinator.start()?;
        }
        self.apply_events();
        Ok(())
    }

    /// Status bar text: the running task and its live elapsed time
    pub fn status_line(&self) -> String {
        let Some(key) = self.coordinator.running_key() else {
            return "No timer running".to_string();
        };
        match self.coordinator.elapsed(key) {
            Ok(Some(elapsed)) => format!("{}: {}", key, format_elapsed(elapsed)),
            _ => key.to_string(),
        }
    }

    /// One pass of the host loop: due ticks, branch polling, pending events
    pub fn tick(&mut self) -> Result<()> {
        if let Err(e) = self.coordinator.tick() {
            error!(error = %e, "failed to save timer snapshot");
            self.message = Some(Notice::error(format!("Failed to save timer: {}", e)));
        }
        self.poll_branch();
        self.apply_events();
        Ok(())
    }

    /// Save the running timer when the terminal loses focus
    pub fn on_focus_lost(&mut self) {
        if let Err(e) = self.coordinator.persist_snapshot() {
            error!(error = %e, "failed to save timer snapshot on focus loss");
            self.message = Some(Notice::error(format!("Failed to save timer: {}", e)));
        }
    }

    fn poll_branch(&mut self) {
        let Some(watcher) = self.watcher.as_mut() else {
            return;
        };
        let branch = match watcher.poll() {
            Ok(branch) => branch,
            Err(e) => {
                warn!(error = %e, "failed to read current branch");
                return;
            }
        };
        let Some(branch) = branch else {
            return;
        };

        match handle_branch_change(&mut self.coordinator, Some(&branch)) {
            Ok(BranchOutcome::Started(key)) => {
                notifications::notify_auto_started(&key, &branch);
                if let Some(index) = self.rows.iter().position(|row| row.key == key) {
                    self.selected_index = index;
                }
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, branch = %branch, "failed to handle branch change"),
        }
    }

    /// Fold pending core events into the view
    pub fn apply_events(&mut self) {
        let mut dirty = false;
        for event in self.coordinator.drain_events() {
            match event {
                UiEvent::TasksChanged | UiEvent::TaskChanged(_) => dirty = true,
                UiEvent::Notice(notice) => self.message = Some(notice),
            }
        }
        if dirty {
            if let Err(e) = self.refresh_rows() {
                error!(error = %e, "failed to reload tasks");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::coordinator::tests::{coordinator_with, TestCoordinator, T0};
    use crate::domain::clock::ManualClock;
    use crate::domain::{RunStatus, Severity, TaskRecord, TimerState};
    use crate::persistence::store::MemoryBlobStore;
    use pretty_assertions::assert_eq;

    pub type TestApp = AppState<MemoryBlobStore, ManualClock>;

    pub fn create_test_app() -> (TestApp, ManualClock) {
        let (coordinator, clock): (TestCoordinator, _) = coordinator_with(vec![
            TaskRecord::new("A-1", None).with_state(TimerState::stopped(61_000)),
            TaskRecord::new("B-2", None).with_branch("feat/b"),
        ]);
        (AppState::new(coordinator, None), clock)
    }

    #[test]
    fn test_app_state_new() {
        let (app, _) = create_test_app();
        assert_eq!(app.rows.len(), 2);
        assert_eq!(app.selected_index, 0);
        assert_eq!(app.selected_key(), Some("A-1"));
        assert_eq!(app.status_line(), "No timer running");
    }

    #[test]
    fn test_move_selection() {
        let (mut app, _) = create_test_app();
        app.move_selection_down();
        assert_eq!(app.selected_key(), Some("B-2"));
        assert_eq!(app.coordinator.active_key(), Some("B-2"));

        // stays at the end
        app.move_selection_down();
        assert_eq!(app.selected_index, 1);

        app.move_selection_up();
        app.move_selection_up();
        assert_eq!(app.selected_index, 0);
    }

    #[test]
    fn test_toggle_timer() {
        let (mut app, clock) = create_test_app();
        app.toggle_timer().unwrap();
        assert_eq!(app.coordinator.running_key(), Some("A-1"));
        assert_eq!(app.rows[0].status, RunStatus::Running);

        clock.advance(4_000);
        app.tick().unwrap();
        assert_eq!(app.status_line(), "A-1: 0:01:05");
        assert_eq!(app.rows[0].elapsed_ms, 65_000);

        app.toggle_timer().unwrap();
        assert!(!app.coordinator.is_running());
        assert_eq!(app.rows[0].status, RunStatus::Stopped);
    }

    #[test]
    fn test_toggle_other_task_switches_timer() {
        let (mut app, _) = create_test_app();
        app.toggle_timer().unwrap();
        app.move_selection_down();
        app.toggle_timer().unwrap();

        assert_eq!(app.coordinator.running_key(), Some("B-2"));
        assert_eq!(app.rows[0].status, RunStatus::Stopped);
        assert_eq!(app.rows[1].status, RunStatus::Running);
    }

    #[test]
    fn test_focus_lost_saves_running_timer() {
        let (mut app, clock) = create_test_app();
        app.toggle_timer().unwrap();
        clock.advance(3_000);

        app.on_focus_lost();
        assert_eq!(
            app.coordinator.store().get_timer_state("A-1").unwrap(),
            Some(TimerState::running(64_000, T0 + 3_000))
        );
        assert!(app.coordinator.is_running());
    }

    #[test]
    fn test_focus_lost_without_timer_changes_nothing() {
        let (mut app, _) = create_test_app();
        app.on_focus_lost();
        assert_eq!(
            app.coordinator.store().get_timer_state("A-1").unwrap(),
            Some(TimerState::stopped(61_000))
        );
    }

    #[test]
    fn test_notices_become_message() {
        let (mut app, _) = create_test_app();
        app.coordinator.notice(Notice::warning("careful"));
        app.apply_events();

        let message = app.message.clone().unwrap();
        assert_eq!(message.severity, Severity::Warning);
        assert_eq!(message.message, "careful");
    }
}
