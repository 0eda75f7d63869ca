use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use super::{ObjectMeta, ObjectStore, StorageError, StorageResult};
use crate::config::FilesystemStorageConfig;

/// Filesystem object store.
///
/// Storage keys are resolved relative to the configured root directory.
pub struct FilesystemObjectStore {
    config: FilesystemStorageConfig,
}

impl FilesystemObjectStore {
    /// Open the store, creating the root directory if it does not exist.
    pub fn new(config: FilesystemStorageConfig) -> StorageResult<Self> {
        let root = Path::new(&config.path);
        if !root.exists() {
            info!(path = %config.path, "Creating object storage directory");
            std::fs::create_dir_all(root)?;
        }
        Ok(Self { config })
    }

    fn object_path(&self, key: &str) -> StorageResult<PathBuf> {
        self.config
            .object_path(key)
            .ok_or_else(|| StorageError::InvalidKey(key.to_string()))
    }
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    #[instrument(skip(self))]
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        let path = self.object_path(key)?;

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(ObjectMeta { size: meta.len() }),
            Ok(_) => Err(StorageError::InvalidKey(format!("{key} is not a file"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.object_path(key)?;
        debug!(path = %path.display(), "Deleting object from filesystem");

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}
