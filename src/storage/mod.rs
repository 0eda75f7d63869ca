//! Pluggable object storage backends holding the audio files.
//!
//! - **S3**: AWS S3 or any S3-compatible service (feature `s3-storage`)
//! - **Filesystem**: a local directory, for development
//!
//! Backends must report a missing object as [`StorageError::NotFound`] so the
//! reconciler can count it as already deleted rather than failed.

mod error;
mod filesystem;
#[cfg(test)]
pub mod memory;
#[cfg(feature = "s3-storage")]
mod s3;

use std::sync::Arc;

use async_trait::async_trait;
pub use error::{StorageError, StorageResult};
pub use filesystem::FilesystemObjectStore;
#[cfg(feature = "s3-storage")]
pub use s3::S3ObjectStore;
use tracing::info;

use crate::config::ObjectStoreConfig;

/// Metadata read before deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectMeta {
    pub size: u64,
}

/// Trait for pluggable object storage backends.
///
/// Implementations must be `Send + Sync` to support async contexts.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read the object's metadata without fetching its content.
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta>;

    /// Delete an object. Returns `NotFound` when the backend can tell the
    /// object was already gone.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Get the backend type name (for logging/debugging).
    fn backend_name(&self) -> &'static str;
}

/// Create an object store from configuration.
///
/// Returns `None` when no object store is configured.
pub async fn create_object_store(
    config: &ObjectStoreConfig,
) -> StorageResult<Option<Arc<dyn ObjectStore>>> {
    match config {
        ObjectStoreConfig::None => {
            info!("No object store configured");
            Ok(None)
        }
        ObjectStoreConfig::Filesystem(fs_config) => {
            info!(path = %fs_config.path, "Using filesystem object store");
            Ok(Some(Arc::new(FilesystemObjectStore::new(
                fs_config.clone(),
            )?)))
        }
        #[cfg(feature = "s3-storage")]
        ObjectStoreConfig::S3(s3_config) => {
            info!(bucket = %s3_config.bucket, "Using S3 object store");
            Ok(Some(Arc::new(S3ObjectStore::new(s3_config.clone()).await)))
        }
    }
}
