use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Periodic trigger configuration.
///
/// The trigger is the scheduler side of the job: it calls `POST /cleanup` on
/// a running janitor service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerConfig {
    /// Full URL of the cleanup endpoint.
    #[serde(default = "default_url")]
    pub url: String,

    /// Hours between invocations in loop mode.
    /// Default: 6
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,

    /// Wall-clock timeout for one invocation, in seconds. Expiry is reported
    /// as an incomplete run.
    /// Default: 60
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            interval_hours: default_interval_hours(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_url() -> String {
    "http://127.0.0.1:8030/cleanup".to_string()
}

fn default_interval_hours() -> u64 {
    6
}

fn default_timeout_secs() -> u64 {
    60
}

impl TriggerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.url).map_err(|e| {
            ConfigError::Validation(format!("Invalid trigger URL '{}': {}", self.url, e))
        })?;
        if self.interval_hours == 0 {
            return Err(ConfigError::Validation(
                "trigger.interval_hours must be greater than 0".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "trigger.timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Get the interval as a Duration.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_hours * 3600)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
