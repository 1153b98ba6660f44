use crate::domain::{Clock, TimerState};
use crate::error::TimerError;
use crate::notifications::{EventQueue, Notice, UiEvent};
use crate::persistence::{BlobStore, Config, TaskStore};
use crate::recovery::{restore_active_timer, RecoveryOutcome};
use crate::ticker::{Scheduler, Tick, DEFAULT_PERSIST_MS, DEFAULT_UI_REFRESH_MS};
use anyhow::Result;
use tracing::{debug, error, info, warn};

/// Timer policy knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSettings {
    pub ui_refresh_ms: u64,
    pub persist_interval_ms: u64,
    /// Longest run that is still resumed after a restart
    pub max_restore_ms: u64,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            ui_refresh_ms: DEFAULT_UI_REFRESH_MS,
            persist_interval_ms: DEFAULT_PERSIST_MS,
            max_restore_ms: 24 * 60 * 60 * 1000,
        }
    }
}

impl From<&Config> for TimerSettings {
    fn from(config: &Config) -> Self {
        Self {
            ui_refresh_ms: config.ui_refresh_ms,
            persist_interval_ms: config.persist_interval_ms,
            max_restore_ms: config.max_restore_ms,
        }
    }
}

/// Which task is selected and which one is being timed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub active_key: Option<String>,
    pub running_key: Option<String>,
}

impl SessionState {
    pub fn is_running(&self) -> bool {
        self.running_key.is_some()
    }
}

/// Single writer for timer state: owns the store, the session and the ticks.
pub struct TimerCoordinator<B: BlobStore, C: Clock> {
    store: TaskStore<B>,
    clock: C,
    settings: TimerSettings,
    session: SessionState,
    scheduler: Scheduler,
    events: EventQueue,
}

impl<B: BlobStore, C: Clock> TimerCoordinator<B, C> {
    pub fn new(store: TaskStore<B>, clock: C, settings: TimerSettings) -> Self {
        Self {
            store,
            clock,
            scheduler: Scheduler::new(settings.ui_refresh_ms, settings.persist_interval_ms),
            settings,
            session: SessionState::default(),
            events: EventQueue::default(),
        }
    }

    /// Build a coordinator and bring back a timer left running by a previous
    /// process before anything else touches the store.
    pub fn recover(
        store: TaskStore<B>,
        clock: C,
        settings: TimerSettings,
    ) -> Result<(Self, RecoveryOutcome), TimerError> {
        let mut coordinator = Self::new(store, clock, settings);
        let outcome = restore_active_timer(&mut coordinator)?;
        Ok((coordinator, outcome))
    }

    pub fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn active_key(&self) -> Option<&str> {
        self.session.active_key.as_deref()
    }

    pub fn running_key(&self) -> Option<&str> {
        self.session.running_key.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.session.is_running()
    }

    pub fn store(&self) -> &TaskStore<B> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TaskStore<B> {
        &mut self.store
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn emit(&mut self, event: UiEvent) {
        self.events.push(event);
    }

    pub fn notice(&mut self, notice: Notice) {
        self.events.notice(notice);
    }

    /// Pending refresh signals and messages, oldest first
    pub fn drain_events(&mut self) -> Vec<UiEvent> {
        self.events.drain()
    }

    /// Total tracked time of a task right now
    pub fn elapsed(&self, key: &str) -> Result<Option<u64>> {
        let now = self.now();
        Ok(self.store.get_timer_state(key)?.map(|state| state.elapsed(now)))
    }

    /// Choose the task the next `start` applies to. Does not touch run state.
    pub fn select_task(&mut self, key: &str) -> Result<(), TimerError> {
        let key = key.trim();
        if key.is_empty() {
            warn!("attempt to select a task with an empty key");
            self.notice(Notice::error("Error: task key not specified"));
            return Err(TimerError::EmptyTaskKey);
        }
        self.session.active_key = Some(key.to_string());
        debug!(task = key, "task selected");
        Ok(())
    }

    pub fn deselect(&mut self) {
        self.session.active_key = None;
    }

    /// Start timing the selected task.
    ///
    /// If another task is being timed it is stopped first, and any other timer
    /// found running in the store is folded, so at most one timer accrues.
    pub fn start(&mut self) -> Result<(), TimerError> {
        let Some(key) = self.session.active_key.clone() else {
            warn!("attempt to start timer without selected task");
            self.notice(Notice::error("Error: no task selected for tracking"));
            return Err(TimerError::NoTaskSelected);
        };

        if self.session.running_key.as_deref() == Some(key.as_str()) {
            info!(task = %key, "timer is already running");
            return Ok(());
        }

        if self.store.get_timer_state(&key)?.is_none() {
            error!(task = %key, "task not found when trying to start timer");
            self.notice(Notice::error("Error: task not found"));
            return Err(TimerError::TaskNotFound(key));
        }

        if let Some(previous) = self.session.running_key.clone() {
            info!(from = %previous, to = %key, "switching timer to another task");
            self.stop()?;
        }
        self.fold_stray_timers(&key)?;

        let now = self.now();
        let state = self
            .store
            .get_timer_state(&key)?
            .unwrap_or_default()
            .start(now);
        self.store.set_timer_state(&key, state)?;

        self.session.running_key = Some(key.clone());
        self.scheduler.start_all(now);
        self.emit(UiEvent::TaskChanged(key.clone()));
        info!(task = %key, "timer started");
        Ok(())
    }

    /// Stop the running timer and persist its accumulated time
    pub fn stop(&mut self) -> Result<(), TimerError> {
        let Some(key) = self.session.running_key.clone() else {
            info!("attempt to stop inactive timer");
            return Ok(());
        };

        // The session stays running until the stopped state is on disk
        let now = self.now();
        match self.store.get_timer_state(&key)? {
            Some(state) => {
                let stopped = state.stop(now);
                self.store.set_timer_state(&key, stopped)?;
                info!(task = %key, elapsed_ms = stopped.elapsed_ms, "timer stopped");
            }
            None => {
                warn!(task = %key, "task not found when trying to stop timer");
            }
        }

        self.session.running_key = None;
        self.scheduler.cancel_all();
        self.emit(UiEvent::TaskChanged(key));
        Ok(())
    }

    /// Fire whatever periodic work is due. Called by the host loop.
    pub fn tick(&mut self) -> Result<()> {
        let now = self.now();
        for tick in self.scheduler.due(now) {
            match tick {
                Tick::UiRefresh => {
                    if let Some(key) = self.session.running_key.clone() {
                        self.emit(UiEvent::TaskChanged(key));
                    }
                }
                Tick::Persist => self.persist_snapshot()?,
            }
        }
        Ok(())
    }

    /// Write a snapshot of the running timer so a crash loses at most one interval
    pub fn persist_snapshot(&mut self) -> Result<()> {
        let Some(key) = self.session.running_key.clone() else {
            return Ok(());
        };
        let Some(state) = self.store.get_timer_state(&key)? else {
            return Ok(());
        };
        if state.is_running() {
            let snapshot = state.snapshot(self.now());
            self.store.set_timer_state(&key, snapshot)?;
            debug!(task = %key, elapsed_ms = snapshot.elapsed_ms, "timer snapshot saved");
        }
        Ok(())
    }

    /// Flush a running session and cancel the ticks before the process exits.
    /// The timer stays running on disk so the next start can resume it.
    pub fn shutdown(&mut self) -> Result<()> {
        let flushed = self.persist_snapshot();
        self.scheduler.cancel_all();
        flushed
    }

    fn fold_stray_timers(&mut self, keep: &str) -> Result<()> {
        let now = self.now();
        for key in self.store.running_keys()? {
            if key == keep {
                continue;
            }
            if let Some(state) = self.store.get_timer_state(&key)? {
                warn!(task = %key, "stopping timer left running on another task");
                self.store.set_timer_state(&key, state.stop(now))?;
                self.emit(UiEvent::TaskChanged(key));
            }
        }
        Ok(())
    }

    /// Overwrite a task's timer, e.g. after its time was sent
    pub fn replace_state(&mut self, key: &str, state: TimerState) -> Result<bool> {
        let updated = self.store.set_timer_state(key, state)?;
        if updated {
            self.emit(UiEvent::TaskChanged(key.to_string()));
        }
        Ok(updated)
    }
}
