use std::time::Duration;

/// Default UI refresh interval in milliseconds
pub const DEFAULT_UI_REFRESH_MS: u64 = 1_000;

/// Default persistence interval in milliseconds
pub const DEFAULT_PERSIST_MS: u64 = 5_000;

/// How long the host loop waits for input before ticking
pub const POLL_MS: u64 = 250;

/// Get host poll duration
pub fn poll_duration() -> Duration {
    Duration::from_millis(POLL_MS)
}

/// Periodic actions driven while a timer runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    UiRefresh,
    Persist,
}

/// A repeating deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Repeating {
    interval_ms: i64,
    next_due: i64,
}

impl Repeating {
    fn new(interval_ms: u64, now: i64) -> Self {
        let interval_ms = i64::try_from(interval_ms.max(1)).unwrap_or(i64::MAX);
        Self {
            interval_ms,
            next_due: now.saturating_add(interval_ms),
        }
    }

    /// Fire at most once per poll; missed periods collapse into one firing
    fn poll(&mut self, now: i64) -> bool {
        if now < self.next_due {
            return false;
        }
        let missed = (now - self.next_due) / self.interval_ms;
        self.next_due = self
            .next_due
            .saturating_add((missed + 1).saturating_mul(self.interval_ms));
        true
    }
}

/// Two independently cancellable repeating ticks.
///
/// Nothing fires on its own: the owner calls [`Scheduler::due`] from its loop,
/// so once [`Scheduler::cancel_all`] returns no tick can fire.
#[derive(Debug, Clone)]
pub struct Scheduler {
    ui_interval_ms: u64,
    persist_interval_ms: u64,
    ui: Option<Repeating>,
    persist: Option<Repeating>,
}

impl Scheduler {
    pub fn new(ui_interval_ms: u64, persist_interval_ms: u64) -> Self {
        Self {
            ui_interval_ms,
            persist_interval_ms,
            ui: None,
            persist: None,
        }
    }

    /// (Re)arm both ticks starting from `now`
    pub fn start_all(&mut self, now: i64) {
        self.ui = Some(Repeating::new(self.ui_interval_ms, now));
        self.persist = Some(Repeating::new(self.persist_interval_ms, now));
    }

    pub fn cancel_all(&mut self) {
        self.ui = None;
        self.persist = None;
    }

    pub fn is_armed(&self, tick: Tick) -> bool {
        match tick {
            Tick::UiRefresh => self.ui.is_some(),
            Tick::Persist => self.persist.is_some(),
        }
    }

    /// Ticks whose deadline has passed at `now`, UI refresh first
    pub fn due(&mut self, now: i64) -> Vec<Tick> {
        let mut fired = Vec::new();
        if self.ui.as_mut().is_some_and(|ui| ui.poll(now)) {
            fired.push(Tick::UiRefresh);
        }
        if self.persist.as_mut().is_some_and(|persist| persist.poll(now)) {
            fired.push(Tick::Persist);
        }
        fired
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(DEFAULT_UI_REFRESH_MS, DEFAULT_PERSIST_MS)
    }
}
