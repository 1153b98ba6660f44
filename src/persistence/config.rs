use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const TOKEN_ENV: &str = "TRACKER_HELPER_TOKEN";
pub const ORG_ID_ENV: &str = "TRACKER_HELPER_ORG_ID";

/// Settings stored in config.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tracker API root
    pub base_url: String,
    pub org_id: String,
    /// Header carrying the organization id ("X-Org-ID" or "X-Cloud-Org-ID")
    pub org_id_header: String,
    /// OAuth token; prefer the environment variable over storing it here
    pub token: String,

    // Worklog duration folding
    pub work_day_hours: u64,
    pub work_week_days: u64,

    // Timer policy (milliseconds)
    pub ui_refresh_ms: u64,
    pub persist_interval_ms: u64,
    pub max_restore_ms: u64,
    pub min_send_ms: u64,

    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://api.tracker.yandex.net/v3".to_string(),
            org_id: String::new(),
            org_id_header: "X-Org-ID".to_string(),
            token: String::new(),
            work_day_hours: 8,
            work_week_days: 5,
            ui_refresh_ms: 1_000,
            persist_interval_ms: 5_000,
            max_restore_ms: 24 * 60 * 60 * 1000,
            min_send_ms: 1_000,
            request_timeout_secs: 10,
        }
    }
}

impl Config {
    /// Apply token/org overrides from the environment
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.trim().is_empty() {
                self.token = token.trim().to_string();
            }
        }
        if let Ok(org_id) = std::env::var(ORG_ID_ENV) {
            if !org_id.trim().is_empty() {
                self.org_id = org_id.trim().to_string();
            }
        }
        self
    }

    /// Both token and organization id are present
    pub fn has_credentials(&self) -> bool {
        !self.token.trim().is_empty() && !self.org_id.trim().is_empty()
    }
}

/// Load config from config.json, defaults when the file is missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();

    let Some(content) = crate::persistence::read_file(path)? else {
        return Ok(Config::default());
    };
    let config: Config = serde_json::from_str(&content)
        .with_context(|| format!("Invalid config file: {}", path.display()))?;
    Ok(config)
}

/// Save config to config.json
pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    crate::persistence::atomic_write(path, &json)?;
    Ok(())
}

/// Blank the stored token, leaving every other setting as is.
/// Returns true when a token was removed.
pub fn forget_token<P: AsRef<Path>>(path: P) -> Result<bool> {
    let path = path.as_ref();
    let mut config = load_config(path)?;
    if config.token.is_empty() {
        return Ok(false);
    }
    config.token.clear();
    save_config(path, &config)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_nonexistent_config() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.json");

        let config = load_config(&path).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.max_restore_ms, 86_400_000);
        assert!(!config.has_credentials());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.json");

        let config = Config {
            org_id: "12345".to_string(),
            token: "secret".to_string(),
            work_day_hours: 6,
            ..Config::default()
        };
        save_config(&path, &config).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(loaded.has_credentials());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, r#"{ "org_id": "777", "persist_interval_ms": 2000 }"#).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.org_id, "777");
        assert_eq!(loaded.persist_interval_ms, 2_000);
        assert_eq!(loaded.ui_refresh_ms, 1_000);
        assert_eq!(loaded.org_id_header, "X-Org-ID");
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_forget_token_keeps_other_settings() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        let config = Config {
            token: "secret".to_string(),
            org_id: "42".to_string(),
            work_day_hours: 6,
            ..Config::default()
        };
        save_config(&path, &config).unwrap();

        assert!(forget_token(&path).unwrap());
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.token, "");
        assert_eq!(loaded.org_id, "42");
        assert_eq!(loaded.work_day_hours, 6);

        // nothing left to remove
        assert!(!forget_token(&path).unwrap());
    }
}
