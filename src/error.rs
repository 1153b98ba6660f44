use thiserror::Error;

/// Precondition failures of timer operations
#[derive(Debug, Error)]
pub enum TimerError {
    #[error("no task selected for tracking")]
    NoTaskSelected,

    #[error("task key not specified")]
    EmptyTaskKey,

    #[error("task {0} not found")]
    TaskNotFound(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Failures talking to the tracker service, classified where the response is read
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("tracker credentials are not configured (token and organization id)")]
    MissingCredentials,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The service answered with an error status
    #[error("tracker responded with status {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never produced a usable response
    #[error("request failed: {0}")]
    Transport(String),
}

impl TrackerError {
    /// Error messages reported by the tracker, falling back to the raw body
    pub fn detail(&self) -> Option<String> {
        let TrackerError::Status { body, .. } = self else {
            return None;
        };
        let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
        let messages = parsed
            .as_ref()
            .and_then(|value| value.get("errorMessages"))
            .and_then(|messages| messages.as_array())
            .map(|messages| {
                messages
                    .iter()
                    .filter_map(|message| message.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .filter(|joined| !joined.is_empty());
        messages.or_else(|| Some(body.clone()).filter(|body| !body.trim().is_empty()))
    }
}

/// Errors of the send/fetch operations
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Timer(#[from] TimerError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

impl From<anyhow::Error> for SyncError {
    fn from(error: anyhow::Error) -> Self {
        SyncError::Timer(TimerError::Storage(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_detail_joins_error_messages() {
        let error = TrackerError::Status {
            status: 403,
            body: r#"{"errorMessages":["No access","Try again"],"statusCode":403}"#.to_string(),
        };
        assert_eq!(error.detail().as_deref(), Some("No access, Try again"));
    }

    #[test]
    fn test_status_detail_falls_back_to_body() {
        let error = TrackerError::Status {
            status: 502,
            body: "Bad Gateway".to_string(),
        };
        assert_eq!(error.detail().as_deref(), Some("Bad Gateway"));

        let empty = TrackerError::Status {
            status: 500,
            body: String::new(),
        };
        assert_eq!(empty.detail(), None);
    }

    #[test]
    fn test_transport_has_no_detail() {
        assert_eq!(TrackerError::Transport("timeout".to_string()).detail(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(TimerError::NoTaskSelected.to_string(), "no task selected for tracking");
        assert_eq!(
            TimerError::TaskNotFound("A-1".to_string()).to_string(),
            "task A-1 not found"
        );
    }
}
