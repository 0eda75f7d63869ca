//! In-memory object store for tests.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use super::{ObjectMeta, ObjectStore, StorageError, StorageResult};

/// Object store double with injectable failures.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: DashMap<String, u64>,
    head_failures: DashMap<String, String>,
    delete_failures: DashMap<String, String>,
    delete_delay: Mutex<Option<Duration>>,
    deleted: Mutex<Vec<String>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, key: &str, size: u64) -> Self {
        self.objects.insert(key.to_string(), size);
        self
    }

    /// Make `head` fail for `key` with a non-not-found error.
    pub fn fail_head(&self, key: &str, message: &str) {
        self.head_failures
            .insert(key.to_string(), message.to_string());
    }

    /// Make `delete` fail for `key` with a non-not-found error.
    pub fn fail_delete(&self, key: &str, message: &str) {
        self.delete_failures
            .insert(key.to_string(), message.to_string());
    }

    pub fn set_delete_delay(&self, delay: Duration) {
        *self.delete_delay.lock() = Some(delay);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.contains_key(key)
    }

    /// Keys successfully deleted, in call order.
    pub fn deleted_keys(&self) -> Vec<String> {
        self.deleted.lock().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        if let Some(message) = self.head_failures.get(key) {
            return Err(StorageError::S3(message.clone()));
        }
        self.objects
            .get(key)
            .map(|size| ObjectMeta { size: *size })
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let delay = *self.delete_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = self.delete_failures.get(key) {
            return Err(StorageError::S3(message.clone()));
        }
        match self.objects.remove(key) {
            Some(_) => {
                self.deleted.lock().push(key.to_string());
                Ok(())
            }
            None => Err(StorageError::NotFound(key.to_string())),
        }
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
