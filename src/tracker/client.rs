use super::format::{format_start, iso8601_duration, WorkCalendar};
use super::{RemoteTask, RemoteUser, TrackerService};
use crate::error::TrackerError;
use crate::persistence::Config;
use chrono::{DateTime, Duration as ChronoDuration, Local};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error};

const USER_AGENT: &str = concat!("tracker-helper/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct WorklogBody<'a> {
    start: String,
    duration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<&'a str>,
}

/// Tracker API v3 over blocking HTTP
pub struct HttpTracker {
    agent: ureq::Agent,
    base_url: String,
    token: String,
    org_id: String,
    org_id_header: String,
    calendar: WorkCalendar,
    current_user: Option<RemoteUser>,
}

impl HttpTracker {
    pub fn from_config(config: &Config) -> Self {
        Self {
            agent: make_agent(Duration::from_secs(config.request_timeout_secs.max(1))),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.trim().to_string(),
            org_id: config.org_id.trim().to_string(),
            org_id_header: config.org_id_header.clone(),
            calendar: WorkCalendar {
                day_hours: config.work_day_hours,
                week_days: config.work_week_days,
            },
            current_user: None,
        }
    }

    fn check_credentials(&self) -> Result<(), TrackerError> {
        if self.token.is_empty() || self.org_id.is_empty() {
            return Err(TrackerError::MissingCredentials);
        }
        Ok(())
    }

    fn authorize<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        request
            .header("User-Agent", USER_AGENT)
            .header("Authorization", format!("OAuth {}", self.token).as_str())
            .header(self.org_id_header.as_str(), self.org_id.as_str())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl TrackerService for HttpTracker {
    fn get_current_user(&mut self) -> Result<RemoteUser, TrackerError> {
        self.check_credentials()?;
        let response = self
            .authorize(self.agent.get(&self.url("/myself")))
            .call()
            .map_err(|err| TrackerError::Transport(err.to_string()))?;

        let user: RemoteUser = read_json(response, "getCurrentUser")?;
        self.current_user = Some(user.clone());
        Ok(user)
    }

    fn get_tasks(&mut self) -> Result<Vec<RemoteTask>, TrackerError> {
        self.check_credentials()?;
        let uid = match &self.current_user {
            Some(user) => user.uid,
            None => self.get_current_user()?.uid,
        };

        let filter = serde_json::json!({ "filter": { "assignee": uid, "author": uid } });
        let response = self
            .authorize(self.agent.post(&self.url("/issues/_search")))
            .send_json(&filter)
            .map_err(|err| TrackerError::Transport(err.to_string()))?;

        let tasks: Vec<RemoteTask> = read_json(response, "getTasks")?;
        debug!(count = tasks.len(), "fetched tasks");
        Ok(tasks)
    }

    fn add_worklog(
        &mut self,
        task_id_or_key: &str,
        duration_ms: u64,
        start: Option<DateTime<Local>>,
        comment: Option<&str>,
    ) -> Result<(), TrackerError> {
        let task = task_id_or_key.trim();
        if task.is_empty() {
            return Err(TrackerError::InvalidRequest(
                "task key or id cannot be empty".to_string(),
            ));
        }
        if duration_ms == 0 {
            return Err(TrackerError::InvalidRequest("time cannot be zero".to_string()));
        }
        self.check_credentials()?;

        let start = start.unwrap_or_else(|| {
            Local::now() - ChronoDuration::milliseconds(duration_ms.min(i64::MAX as u64) as i64)
        });
        let body = WorklogBody {
            start: format_start(&start),
            duration: iso8601_duration(duration_ms, self.calendar),
            comment: comment.filter(|comment| !comment.trim().is_empty()),
        };

        let response = self
            .authorize(self.agent.post(&self.url(&format!("/issues/{}/worklog", task))))
            .send_json(&body)
            .map_err(|err| TrackerError::Transport(err.to_string()))?;

        ensure_success(response, "addWorklog").map(|_| ())
    }
}

fn make_agent(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build();
    config.into()
}

/// Turn a non-2xx response into `TrackerError::Status` carrying the body
fn ensure_success(
    mut response: ureq::http::Response<ureq::Body>,
    operation: &str,
) -> Result<ureq::http::Response<ureq::Body>, TrackerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.body_mut().read_to_string().unwrap_or_default();
    error!(operation, status = status.as_u16(), body = %body, "tracker request failed");
    Err(TrackerError::Status {
        status: status.as_u16(),
        body,
    })
}

fn read_json<T: serde::de::DeserializeOwned>(
    response: ureq::http::Response<ureq::Body>,
    operation: &str,
) -> Result<T, TrackerError> {
    let mut response = ensure_success(response, operation)?;
    response
        .body_mut()
        .read_json::<T>()
        .map_err(|err| TrackerError::Transport(format!("{}: {}", operation, err)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unconfigured() -> HttpTracker {
        HttpTracker::from_config(&Config::default())
    }

    #[test]
    fn test_worklog_rejects_empty_task() {
        let mut tracker = unconfigured();
        let err = tracker.add_worklog("  ", 5_000, None, None).unwrap_err();
        assert!(matches!(err, TrackerError::InvalidRequest(_)));
    }

    #[test]
    fn test_worklog_rejects_zero_duration() {
        let mut tracker = unconfigured();
        let err = tracker.add_worklog("PROJ-1", 0, None, None).unwrap_err();
        assert!(matches!(err, TrackerError::InvalidRequest(_)));
    }

    #[test]
    fn test_requests_need_credentials() {
        let mut tracker = unconfigured();
        assert!(matches!(
            tracker.get_tasks(),
            Err(TrackerError::MissingCredentials)
        ));
        assert!(matches!(
            tracker.add_worklog("PROJ-1", 5_000, None, None),
            Err(TrackerError::MissingCredentials)
        ));
    }

    #[test]
    fn test_worklog_body_omits_empty_comment() {
        let body = WorklogBody {
            start: "2024-01-01T10:00:00.000+0000".to_string(),
            duration: "PT1H".to_string(),
            comment: None,
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"start":"2024-01-01T10:00:00.000+0000","duration":"PT1H"}"#
        );
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let config = Config {
            base_url: "https://tracker.example/v3/".to_string(),
            ..Config::default()
        };
        let tracker = HttpTracker::from_config(&config);
        assert_eq!(tracker.url("/myself"), "https://tracker.example/v3/myself");
    }

    fn configured(server: &mockito::Server) -> HttpTracker {
        HttpTracker::from_config(&Config {
            base_url: server.url(),
            token: "tok".to_string(),
            org_id: "42".to_string(),
            ..Config::default()
        })
    }

    #[test]
    fn test_add_worklog_posts_duration_and_comment() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/issues/PROJ-1/worklog")
            .match_header("authorization", "OAuth tok")
            .match_header("x-org-id", "42")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "duration": "PT1H1M",
                "comment": "review"
            })))
            .with_status(201)
            .with_body("{}")
            .create();

        let mut tracker = configured(&server);
        tracker
            .add_worklog("PROJ-1", 61 * 60 * 1000, None, Some("review"))
            .unwrap();
        mock.assert();
    }

    #[test]
    fn test_error_status_keeps_body() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/issues/PROJ-1/worklog")
            .with_status(403)
            .with_body(r#"{"errorMessages":["No access"],"statusCode":403}"#)
            .create();

        let mut tracker = configured(&server);
        let err = tracker
            .add_worklog("PROJ-1", 5_000, None, None)
            .unwrap_err();
        mock.assert();

        assert!(matches!(err, TrackerError::Status { status: 403, .. }));
        assert_eq!(err.detail().as_deref(), Some("No access"));
    }

    #[test]
    fn test_get_tasks_searches_by_current_user() {
        let mut server = mockito::Server::new();
        let myself = server
            .mock("GET", "/myself")
            .match_header("authorization", "OAuth tok")
            .with_status(200)
            .with_body(r#"{"uid":77,"login":"dev","display":"Dev"}"#)
            .create();
        let search = server
            .mock("POST", "/issues/_search")
            .match_header("x-org-id", "42")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "filter": { "assignee": 77, "author": 77 }
            })))
            .with_status(200)
            .with_body(r#"[{"id":"abc","key":"PROJ-1","summary":"Login page"}]"#)
            .expect(2)
            .create();

        let mut tracker = configured(&server);
        let tasks = tracker.get_tasks().unwrap();
        assert_eq!(
            tasks,
            vec![RemoteTask {
                id: "abc".to_string(),
                key: "PROJ-1".to_string(),
                summary: "Login page".to_string(),
            }]
        );

        // the user is looked up once and reused
        tracker.get_tasks().unwrap();
        myself.assert();
        search.assert();
    }

    #[test]
    fn test_undecodable_body_is_transport_error() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/myself")
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create();

        let mut tracker = configured(&server);
        assert!(matches!(
            tracker.get_current_user(),
            Err(TrackerError::Transport(_))
        ));
    }
}
