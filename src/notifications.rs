//! Refresh signals and user-facing messages emitted by the core.
//! The core never renders; the host drains these and decides how to show them.

use crate::domain::Severity;

#[cfg(target_os = "macos")]
use std::process::Command;

/// A message meant for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// The set of tasks changed (fetched, cleared)
    TasksChanged,
    /// One task's timer or metadata changed
    TaskChanged(String),
    Notice(Notice),
}

/// Queue of pending UI events
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<UiEvent>,
}

impl EventQueue {
    pub fn push(&mut self, event: UiEvent) {
        // Consecutive duplicate refreshes carry no extra information
        if self.events.last() == Some(&event) && !matches!(event, UiEvent::Notice(_)) {
            return;
        }
        self.events.push(event);
    }

    pub fn notice(&mut self, notice: Notice) {
        self.events.push(UiEvent::Notice(notice));
    }

    pub fn drain(&mut self) -> Vec<UiEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Desktop notification when a branch switch started a timer
pub fn notify_auto_started(task_key: &str, branch: &str) {
    #[cfg(target_os = "macos")]
    {
        let script = format!(
            r#"display notification "Timer started for {} on {}" with title "Tracker Helper""#,
            task_key.replace('"', "\\\""),
            branch.replace('"', "\\\"")
        );

        let _ = Command::new("osascript")
            .arg("-e")
            .arg(&script)
            .output();
    }

    #[cfg(not(target_os = "macos"))]
    {
        let _ = (task_key, branch);
    }
}
