use serde::{Deserialize, Serialize};

/// Accumulated time for one task plus the instant the current run began.
///
/// `started_at_ms` is `None` while stopped. While running, `elapsed_ms` holds
/// only the time accumulated before the current run. Timestamps are epoch
/// milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    #[serde(default)]
    pub elapsed_ms: u64,
    #[serde(default)]
    pub started_at_ms: Option<i64>,
}

/// Milliseconds between `since` and `now`, never negative
fn delta_ms(since: i64, now: i64) -> u64 {
    now.saturating_sub(since).max(0) as u64
}

impl TimerState {
    /// Fresh stopped timer with nothing accumulated
    pub fn new() -> Self {
        Self::default()
    }

    /// Stopped timer holding `elapsed_ms`
    pub fn stopped(elapsed_ms: u64) -> Self {
        Self {
            elapsed_ms,
            started_at_ms: None,
        }
    }

    /// Running timer that began at `started_at_ms` on top of `elapsed_ms`
    pub fn running(elapsed_ms: u64, started_at_ms: i64) -> Self {
        Self {
            elapsed_ms,
            started_at_ms: Some(started_at_ms),
        }
    }

    pub fn is_running(&self) -> bool {
        self.started_at_ms.is_some()
    }

    /// Begin a run at `now`. Already running timers keep their original start.
    pub fn start(self, now: i64) -> Self {
        if self.started_at_ms.is_some() {
            return self;
        }
        Self {
            elapsed_ms: self.elapsed_ms,
            started_at_ms: Some(now),
        }
    }

    /// End the current run and fold its time into `elapsed_ms`
    pub fn stop(self, now: i64) -> Self {
        match self.started_at_ms {
            None => self,
            Some(started) => Self {
                elapsed_ms: self.elapsed_ms.saturating_add(delta_ms(started, now)),
                started_at_ms: None,
            },
        }
    }

    /// Fold the running time into `elapsed_ms` and restart the run from `now`.
    ///
    /// The result is what gets persisted while a timer keeps going: it loses
    /// no time and is valid to resume from after a crash.
    pub fn snapshot(self, now: i64) -> Self {
        match self.started_at_ms {
            None => self,
            Some(started) => Self {
                elapsed_ms: self.elapsed_ms.saturating_add(delta_ms(started, now)),
                started_at_ms: Some(now),
            },
        }
    }

    /// Total tracked time at `now`, including the current run
    pub fn elapsed(&self, now: i64) -> u64 {
        match self.started_at_ms {
            None => self.elapsed_ms,
            Some(started) => self.elapsed_ms.saturating_add(delta_ms(started, now)),
        }
    }

    /// Zeroed, stopped timer. Used once time has been sent to the tracker.
    pub fn reset(self) -> Self {
        Self::new()
    }
}

/// Format milliseconds as "H:MM:SS" for the status line and task list
pub fn format_elapsed(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{}:{:02}:{:02}", hours, minutes, seconds)
}
