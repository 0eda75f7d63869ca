//! Configuration module for the audio janitor.
//!
//! The janitor is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax. Without a file, the
//! configuration is assembled from the plain environment variables the
//! service has always used (`SUPABASE_URL`, `S3_BUCKET_NAME`, ...).
//!
//! # Example
//!
//! ```toml
//! [server]
//! port = 8030
//!
//! [record_store]
//! type = "supabase"
//! url = "${SUPABASE_URL}"
//! key = "${SUPABASE_KEY}"
//!
//! [object_store]
//! type = "s3"
//! bucket = "watchme-vault"
//! region = "ap-southeast-2"
//! ```

mod object_store;
mod observability;
mod record_store;
mod retention;
mod server;
mod trigger;

use std::path::Path;

pub use object_store::*;
pub use observability::*;
pub use record_store::*;
pub use retention::*;
use serde::{Deserialize, Serialize};
pub use server::*;
pub use trigger::*;

/// Root configuration for the janitor.
///
/// All sections are optional with defaults. Missing store sections leave the
/// corresponding client unconfigured, which `/health` reports and `/cleanup`
/// refuses with a 500.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JanitorConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Where audio file records are queried and finalized.
    #[serde(default)]
    pub record_store: RecordStoreConfig,

    /// Where the audio objects are stored.
    #[serde(default)]
    pub object_store: ObjectStoreConfig,

    /// Eligibility and batch bounds.
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Periodic trigger settings.
    #[serde(default)]
    pub trigger: TriggerConfig,

    /// Logging and metrics.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl JanitorConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing required variables will cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;

        // Detect feature-gated values before typed deserialization so the
        // user gets an actionable message instead of "unknown variant".
        let raw: toml::Value = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        check_disabled_features(&raw)?;

        let config: JanitorConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;

        Ok(config)
    }

    /// Build configuration from plain environment variables.
    ///
    /// | Variable | Effect |
    /// |---|---|
    /// | `SUPABASE_URL`, `SUPABASE_KEY` | Supabase record store (both required) |
    /// | `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` | S3 object store (both required) |
    /// | `S3_BUCKET_NAME` | Bucket, default `watchme-vault` |
    /// | `AWS_REGION` | Region, default `ap-southeast-2` |
    /// | `JANITOR_API_URL` | Trigger target URL |
    /// | `PORT` | Server port, default 8030 |
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = JanitorConfig::default();

        if let (Some(url), Some(key)) = (env_non_empty("SUPABASE_URL"), env_non_empty("SUPABASE_KEY"))
        {
            config.record_store = RecordStoreConfig::Supabase(SupabaseConfig::new(url, key));
        }

        if let (Some(access_key), Some(secret_key)) = (
            env_non_empty("AWS_ACCESS_KEY_ID"),
            env_non_empty("AWS_SECRET_ACCESS_KEY"),
        ) {
            #[cfg(feature = "s3-storage")]
            {
                let mut s3 = S3StorageConfig {
                    access_key_id: Some(access_key),
                    secret_access_key: Some(secret_key),
                    ..Default::default()
                };
                if let Some(bucket) = env_non_empty("S3_BUCKET_NAME") {
                    s3.bucket = bucket;
                }
                if let Some(region) = env_non_empty("AWS_REGION") {
                    s3.region = Some(region);
                }
                config.object_store = ObjectStoreConfig::S3(s3);
            }
            #[cfg(not(feature = "s3-storage"))]
            {
                let _ = (access_key, secret_key);
                tracing::warn!(
                    "AWS credentials found in the environment but the 's3-storage' feature is not compiled. \
                     Rebuild with: cargo build --features s3-storage"
                );
            }
        }

        if let Some(url) = env_non_empty("JANITOR_API_URL") {
            config.trigger.url = url;
        }

        if let Some(port) = env_non_empty("PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| ConfigError::Validation(format!("Invalid PORT value: {port}")))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.record_store.validate()?;
        self.object_store.validate()?;
        self.retention.validate()?;
        self.trigger.validate()?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Check for feature-gated configuration values before typed deserialization.
fn check_disabled_features(raw: &toml::Value) -> Result<(), ConfigError> {
    let mut issues: Vec<(String, &str)> = Vec::new();

    if let Some(type_val) = raw
        .get("record_store")
        .and_then(|v| v.get("type"))
        .and_then(|v| v.as_str())
    {
        check_record_store_feature(type_val, &mut issues);
    }

    if let Some(type_val) = raw
        .get("object_store")
        .and_then(|v| v.get("type"))
        .and_then(|v| v.as_str())
    {
        check_object_store_feature(type_val, &mut issues);
    }

    if raw
        .get("observability")
        .and_then(|v| v.get("metrics"))
        .and_then(|v| v.get("enabled"))
        .and_then(|v| v.as_bool())
        == Some(true)
    {
        check_metrics_feature(&mut issues);
    }

    if issues.is_empty() {
        return Ok(());
    }

    let details = issues
        .iter()
        .map(|(msg, _)| msg.as_str())
        .collect::<Vec<_>>()
        .join("\n  - ");
    let features = issues
        .iter()
        .map(|(_, feat)| *feat)
        .collect::<Vec<_>>()
        .join(",");

    Err(ConfigError::Validation(format!(
        "Configuration requires features not compiled in this build:\n  \
         - {details}\n\n\
         Rebuild with: cargo build --features {features}\n\
         Or use the 'full' profile: cargo build --features full"
    )))
}

fn check_record_store_feature(type_val: &str, _issues: &mut Vec<(String, &str)>) {
    match type_val {
        #[cfg(not(feature = "database-postgres"))]
        "postgres" => _issues.push((
            "record store type 'postgres' requires the 'database-postgres' feature".into(),
            "database-postgres",
        )),
        _ => {}
    }
}

fn check_object_store_feature(type_val: &str, _issues: &mut Vec<(String, &str)>) {
    match type_val {
        #[cfg(not(feature = "s3-storage"))]
        "s3" => _issues.push((
            "object store type 's3' requires the 's3-storage' feature".into(),
            "s3-storage",
        )),
        _ => {}
    }
}

fn check_metrics_feature(_issues: &mut Vec<(String, &str)>) {
    #[cfg(not(feature = "prometheus"))]
    _issues.push((
        "observability.metrics.enabled requires the 'prometheus' feature".into(),
        "prometheus",
    ));
}

/// Expand environment variables in the format `${VAR_NAME}`.
/// Variables after a `#` on the same line are left untouched.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| ConfigError::Validation(e.to_string()))?;
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');

        let mut line_result = String::with_capacity(line.len());
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let Some(whole) = cap.get(0) else {
                continue;
            };

            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            line_result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            line_result.push_str(&value);

            last_end = whole.end();
        }

        line_result.push_str(&line[last_end..]);
        result.push_str(&line_result);
        result.push('\n');
    }

    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = JanitorConfig::from_str("").unwrap();
        assert!(config.record_store.is_none());
        assert!(config.object_store.is_none());
        assert_eq!(config.server.port, 8030);
        assert_eq!(config.retention.age_hours, 24);
        assert_eq!(config.trigger.interval_hours, 6);
    }

    #[test]
    fn test_full_config() {
        let config = JanitorConfig::from_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [record_store]
            type = "supabase"
            url = "https://example.supabase.co"
            key = "service-role"

            [object_store]
            type = "filesystem"
            path = "/tmp/janitor"

            [retention]
            dry_run = true

            [trigger]
            url = "https://api.example.com/janitor/cleanup"
            timeout_secs = 90

            [observability.logging]
            format = "json"
        "#,
        )
        .unwrap();

        assert_eq!(config.server.bind_address().to_string(), "127.0.0.1:9000");
        assert!(matches!(
            config.record_store,
            RecordStoreConfig::Supabase(_)
        ));
        assert!(matches!(
            config.object_store,
            ObjectStoreConfig::Filesystem(_)
        ));
        assert!(config.retention.dry_run);
        assert_eq!(config.trigger.timeout_secs, 90);
        assert_eq!(config.observability.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = JanitorConfig::from_str(
            r#"
            [retention]
            age_days = 1
        "#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation_runs_on_parse() {
        let result = JanitorConfig::from_str(
            r#"
            [retention]
            page_size = 0
        "#,
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_env_var_expansion() {
        temp_env::with_var("TEST_SUPABASE_KEY", Some("sk-secret"), || {
            let result = expand_env_vars("key = \"${TEST_SUPABASE_KEY}\"").unwrap();
            assert_eq!(result, "key = \"sk-secret\"");
        });
    }

    #[test]
    fn test_env_var_in_comment_ignored() {
        let result = expand_env_vars("# key = \"${NONEXISTENT_VAR}\"").unwrap();
        assert_eq!(result, "# key = \"${NONEXISTENT_VAR}\"");
    }

    #[test]
    fn test_env_var_after_comment_ignored() {
        let result = expand_env_vars("key = \"value\" # ${NONEXISTENT_VAR}").unwrap();
        assert_eq!(result, "key = \"value\" # ${NONEXISTENT_VAR}");
    }

    #[test]
    fn test_missing_env_var_errors() {
        temp_env::with_var_unset("JANITOR_TEST_MISSING", || {
            let result = expand_env_vars("key = \"${JANITOR_TEST_MISSING}\"");
            assert!(
                matches!(result, Err(ConfigError::EnvVarNotFound(name)) if name == "JANITOR_TEST_MISSING")
            );
        });
    }

    #[test]
    fn test_from_env_without_credentials() {
        temp_env::with_vars(
            [
                ("SUPABASE_URL", None::<&str>),
                ("SUPABASE_KEY", None),
                ("AWS_ACCESS_KEY_ID", None),
                ("AWS_SECRET_ACCESS_KEY", None),
                ("JANITOR_API_URL", None),
                ("PORT", None),
            ],
            || {
                let config = JanitorConfig::from_env().unwrap();
                assert!(config.record_store.is_none());
                assert!(config.object_store.is_none());
            },
        );
    }

    #[test]
    fn test_from_env_supabase_requires_both_vars() {
        temp_env::with_vars(
            [
                ("SUPABASE_URL", Some("https://example.supabase.co")),
                ("SUPABASE_KEY", None),
            ],
            || {
                let config = JanitorConfig::from_env().unwrap();
                assert!(config.record_store.is_none());
            },
        );
    }

    #[test]
    fn test_from_env_full() {
        temp_env::with_vars(
            [
                ("SUPABASE_URL", Some("https://example.supabase.co")),
                ("SUPABASE_KEY", Some("service-role")),
                ("AWS_ACCESS_KEY_ID", Some("AKIAEXAMPLE")),
                ("AWS_SECRET_ACCESS_KEY", Some("secret")),
                ("S3_BUCKET_NAME", Some("custom-vault")),
                ("AWS_REGION", Some("us-east-1")),
                ("JANITOR_API_URL", Some("https://api.example.com/janitor/cleanup")),
                ("PORT", Some("8031")),
            ],
            || {
                let config = JanitorConfig::from_env().unwrap();
                match &config.record_store {
                    RecordStoreConfig::Supabase(c) => {
                        assert_eq!(c.url, "https://example.supabase.co");
                        assert_eq!(c.table, "audio_files");
                    }
                    other => panic!("expected supabase, got {other:?}"),
                }
                #[cfg(feature = "s3-storage")]
                match &config.object_store {
                    ObjectStoreConfig::S3(s3) => {
                        assert_eq!(s3.bucket, "custom-vault");
                        assert_eq!(s3.region.as_deref(), Some("us-east-1"));
                    }
                    other => panic!("expected s3, got {other:?}"),
                }
                assert_eq!(
                    config.trigger.url,
                    "https://api.example.com/janitor/cleanup"
                );
                assert_eq!(config.server.port, 8031);
            },
        );
    }

    #[test]
    fn test_from_env_invalid_port() {
        temp_env::with_var("PORT", Some("eighty"), || {
            assert!(matches!(
                JanitorConfig::from_env(),
                Err(ConfigError::Validation(_))
            ));
        });
    }

    #[cfg(not(feature = "database-postgres"))]
    #[test]
    fn test_disabled_postgres_error() {
        let result = JanitorConfig::from_str(
            r#"
            [record_store]
            type = "postgres"
            url = "postgres://localhost/janitor"
        "#,
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("database-postgres"), "got: {err}");
    }

    #[cfg(not(feature = "s3-storage"))]
    #[test]
    fn test_disabled_s3_error() {
        let result = JanitorConfig::from_str(
            r#"
            [object_store]
            type = "s3"
        "#,
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("s3-storage"), "got: {err}");
    }
}
