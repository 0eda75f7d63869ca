//! Object storage configuration.
//!
//! # Example
//!
//! ```toml
//! [object_store]
//! type = "s3"
//! bucket = "watchme-vault"
//! region = "ap-southeast-2"
//! access_key_id = "${AWS_ACCESS_KEY_ID}"
//! secret_access_key = "${AWS_SECRET_ACCESS_KEY}"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Where the audio objects live.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum ObjectStoreConfig {
    /// No object store. `/cleanup` answers 500.
    #[default]
    None,

    /// S3-compatible object storage (AWS S3, MinIO, R2, ...).
    #[cfg(feature = "s3-storage")]
    S3(S3StorageConfig),

    /// Local directory. Storage keys are resolved relative to `path`.
    Filesystem(FilesystemStorageConfig),
}

impl ObjectStoreConfig {
    pub fn is_none(&self) -> bool {
        matches!(self, ObjectStoreConfig::None)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            ObjectStoreConfig::None => Ok(()),
            #[cfg(feature = "s3-storage")]
            ObjectStoreConfig::S3(c) => c.validate().map_err(ConfigError::Validation),
            ObjectStoreConfig::Filesystem(c) => c.validate().map_err(ConfigError::Validation),
        }
    }
}

/// S3 storage configuration.
#[cfg(feature = "s3-storage")]
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct S3StorageConfig {
    /// S3 bucket name.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// AWS region. For non-AWS S3-compatible services, use their region name.
    #[serde(default = "default_region")]
    pub region: Option<String>,

    /// Custom endpoint URL for S3-compatible services.
    /// - MinIO: "http://localhost:9000"
    /// - R2: "https://<account-id>.r2.cloudflarestorage.com"
    #[serde(default)]
    pub endpoint: Option<String>,

    /// AWS access key ID.
    /// If not specified, uses environment variables or IAM role.
    #[serde(default)]
    pub access_key_id: Option<String>,

    /// AWS secret access key.
    /// If not specified, uses environment variables or IAM role.
    #[serde(default)]
    pub secret_access_key: Option<String>,

    /// Use path-style URLs instead of virtual-hosted style.
    /// Required for MinIO and some S3-compatible services.
    #[serde(default)]
    pub force_path_style: bool,
}

#[cfg(feature = "s3-storage")]
impl std::fmt::Debug for S3StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3StorageConfig")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field(
                "access_key_id",
                &self.access_key_id.as_ref().map(|_| "****"),
            )
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "****"),
            )
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

#[cfg(feature = "s3-storage")]
impl Default for S3StorageConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            region: default_region(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            force_path_style: false,
        }
    }
}

#[cfg(feature = "s3-storage")]
impl S3StorageConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.bucket.is_empty() {
            return Err("S3 bucket name cannot be empty".to_string());
        }
        if self.region.is_none() && self.endpoint.is_none() {
            return Err("S3 requires either 'region' or 'endpoint' to be specified".to_string());
        }
        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(
                "S3 'access_key_id' and 'secret_access_key' must be set together".to_string(),
            );
        }
        Ok(())
    }
}

#[cfg(feature = "s3-storage")]
fn default_bucket() -> String {
    "watchme-vault".to_string()
}

#[cfg(feature = "s3-storage")]
fn default_region() -> Option<String> {
    Some("ap-southeast-2".to_string())
}

/// Filesystem storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilesystemStorageConfig {
    /// Root directory; storage keys are joined onto it.
    pub path: String,
}

impl FilesystemStorageConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.path.is_empty() {
            return Err("Filesystem storage path cannot be empty".to_string());
        }
        Ok(())
    }

    /// Resolve a storage key to a path under the root.
    ///
    /// Returns None for keys that would escape the root (absolute paths or
    /// `..` components).
    pub fn object_path(&self, key: &str) -> Option<PathBuf> {
        let relative = std::path::Path::new(key);
        let escapes = relative.components().any(|c| {
            !matches!(
                c,
                std::path::Component::Normal(_) | std::path::Component::CurDir
            )
        });
        if escapes {
            return None;
        }
        Some(PathBuf::from(&self.path).join(relative))
    }
}
