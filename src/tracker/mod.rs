pub mod client;
pub mod format;

use crate::error::TrackerError;
use chrono::{DateTime, Local};
use serde::Deserialize;

pub use client::HttpTracker;
pub use format::{format_start, iso8601_duration, WorkCalendar};

/// A task as returned by the tracker search
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteTask {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub summary: String,
}

/// The account the credentials belong to
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUser {
    pub uid: u64,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub display: String,
}

/// The remote issue tracker as seen by the sync layer
pub trait TrackerService {
    fn get_current_user(&mut self) -> Result<RemoteUser, TrackerError>;

    /// Tasks of the current user
    fn get_tasks(&mut self) -> Result<Vec<RemoteTask>, TrackerError>;

    /// Record `duration_ms` of work on a task. `start` defaults to now minus
    /// the duration.
    fn add_worklog(
        &mut self,
        task_id_or_key: &str,
        duration_ms: u64,
        start: Option<DateTime<Local>>,
        comment: Option<&str>,
    ) -> Result<(), TrackerError>;
}
