use super::timer::TimerState;

/// Run status of a task's timer as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Stopped,
    Running,
}

impl RunStatus {
    pub fn of(state: &TimerState) -> Self {
        if state.is_running() {
            Self::Running
        } else {
            Self::Stopped
        }
    }

    /// Tag used in plain-text listings
    pub fn to_tag(&self) -> &'static str {
        match self {
            Self::Stopped => "STOPPED",
            Self::Running => "RUNNING",
        }
    }

    /// Single-glyph badge for the task list
    pub fn badge(&self) -> &'static str {
        match self {
            Self::Stopped => "·",
            Self::Running => "▶",
        }
    }
}

/// Severity of a message surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_of_state() {
        assert_eq!(RunStatus::of(&TimerState::new()), RunStatus::Stopped);
        assert_eq!(RunStatus::of(&TimerState::running(0, 1)), RunStatus::Running);
    }

    #[test]
    fn test_run_status_to_tag() {
        assert_eq!(RunStatus::Stopped.to_tag(), "STOPPED");
        assert_eq!(RunStatus::Running.to_tag(), "RUNNING");
    }
}
