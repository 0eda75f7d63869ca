//! Retention policy configuration.
//!
//! Controls which audio files are eligible for deletion and how each run is
//! bounded.
//!
//! # Example
//!
//! ```toml
//! [retention]
//! age_hours = 24
//! page_size = 100
//! call_timeout_secs = 30
//!
//! [retention.finalization]
//! strategy = "tombstone"
//! tombstone_column = "deleted_at"
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{ConfigError, record_store::validate_table_name};

/// Upper bound on `page_size`; one run makes two remote calls per candidate.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Data retention configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    /// Minimum age of a record (by `created_at`) before it may be deleted.
    /// Default: 24
    #[serde(default = "default_age_hours")]
    pub age_hours: u32,

    /// Maximum number of candidates fetched per run.
    /// Default: 100
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Maximum number of storage keys echoed back in `deleted_files`.
    /// `deleted_count` always reports the true total.
    /// Default: 100
    #[serde(default = "default_deleted_files_cap")]
    pub deleted_files_cap: usize,

    /// Timeout applied to each remote call made during a run, in seconds.
    /// Default: 30
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Log and report what would be deleted without touching either store.
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,

    /// How records are closed out once their object is gone.
    #[serde(default)]
    pub finalization: FinalizationConfig,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            age_hours: default_age_hours(),
            page_size: default_page_size(),
            deleted_files_cap: default_deleted_files_cap(),
            call_timeout_secs: default_call_timeout_secs(),
            dry_run: false,
            finalization: FinalizationConfig::default(),
        }
    }
}

fn default_age_hours() -> u32 {
    24
}

fn default_page_size() -> u32 {
    100
}

fn default_deleted_files_cap() -> usize {
    100
}

fn default_call_timeout_secs() -> u64 {
    30
}

impl RetentionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.age_hours == 0 {
            return Err(ConfigError::Validation(
                "retention.age_hours must be greater than 0".into(),
            ));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::Validation(format!(
                "retention.page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        if self.call_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "retention.call_timeout_secs must be greater than 0".into(),
            ));
        }
        self.finalization.validate()
    }

    /// Get the retention age as a chrono Duration.
    pub fn age(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.age_hours))
    }

    /// Get the per-call timeout as a Duration.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

/// Record finalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FinalizationConfig {
    /// Default: hard_delete
    #[serde(default)]
    pub strategy: FinalizationStrategy,

    /// Nullable timestamp column set by the tombstone strategy.
    /// Default: "deleted_at"
    #[serde(default = "default_tombstone_column")]
    pub tombstone_column: String,
}

impl Default for FinalizationConfig {
    fn default() -> Self {
        Self {
            strategy: FinalizationStrategy::default(),
            tombstone_column: default_tombstone_column(),
        }
    }
}

impl FinalizationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.strategy == FinalizationStrategy::Tombstone {
            validate_table_name(&self.tombstone_column).map_err(|_| {
                ConfigError::Validation(format!(
                    "Invalid tombstone column '{}'",
                    self.tombstone_column
                ))
            })?;
        }
        Ok(())
    }

    /// Column eligibility must treat as "already closed out", if any.
    pub fn tombstone_column(&self) -> Option<&str> {
        match self.strategy {
            FinalizationStrategy::HardDelete => None,
            FinalizationStrategy::Tombstone => Some(&self.tombstone_column),
        }
    }
}

fn default_tombstone_column() -> String {
    "deleted_at".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizationStrategy {
    /// Remove the row.
    #[default]
    HardDelete,
    /// Keep the row and stamp the tombstone column.
    Tombstone,
}
