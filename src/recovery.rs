use crate::coordinator::TimerCoordinator;
use crate::domain::{format_elapsed, Clock};
use crate::error::TimerError;
use crate::notifications::Notice;
use crate::persistence::BlobStore;
use tracing::{info, warn};

/// What happened to a timer found running at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// No timer was left running
    Idle,
    /// The session was recent enough and timing continues
    Resumed { key: String },
    /// The session was implausibly long and was stopped at startup
    ForceStopped { key: String, age_ms: u64 },
}

/// Resume or close the timer a previous process left running.
///
/// A run older than `max_restore_ms` is treated as abandoned: its time is
/// folded in and it is stopped without arming any ticks. Otherwise the task
/// is selected and started again, which keeps its original start instant.
pub fn restore_active_timer<B: BlobStore, C: Clock>(
    coordinator: &mut TimerCoordinator<B, C>,
) -> Result<RecoveryOutcome, TimerError> {
    let Some(key) = coordinator.store().active_key()? else {
        return Ok(RecoveryOutcome::Idle);
    };
    let Some(state) = coordinator.store().get_timer_state(&key)? else {
        return Ok(RecoveryOutcome::Idle);
    };
    let Some(started_at) = state.started_at_ms else {
        return Ok(RecoveryOutcome::Idle);
    };

    coordinator.select_task(&key)?;

    let now = coordinator.now();
    let age_ms = now.saturating_sub(started_at).max(0) as u64;
    if age_ms > coordinator.settings().max_restore_ms {
        let stopped = state.stop(now);
        coordinator.replace_state(&key, stopped)?;
        warn!(task = %key, age_ms, "timer left running too long, stopped at startup");
        coordinator.notice(Notice::warning(format!(
            "Timer for {} was left running for {} and has been stopped",
            key,
            format_elapsed(age_ms)
        )));
        return Ok(RecoveryOutcome::ForceStopped { key, age_ms });
    }

    coordinator.start()?;
    info!(task = %key, age_ms, "restored running timer");
    Ok(RecoveryOutcome::Resumed { key })
}
