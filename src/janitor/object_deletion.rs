//! Per-object deletion protocol.

use std::time::Duration;

use tracing::{debug, warn};

use crate::storage::{ObjectStore, StorageError};

/// Result of deleting one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionOutcome {
    /// The object existed and is gone now. `size` is 0 when the metadata
    /// read failed.
    Deleted { size: u64 },
    /// The object was already absent.
    AlreadyAbsent,
    /// Any other storage error. The object may still exist.
    Failed(String),
}

/// Read the object's size if possible, then delete it.
///
/// Metadata failures are logged and never escalated. A not-found from either
/// call means the object is already gone.
pub async fn delete_object(
    store: &dyn ObjectStore,
    key: &str,
    call_timeout: Duration,
) -> DeletionOutcome {
    let mut size = None;
    let mut absent = false;

    match tokio::time::timeout(call_timeout, store.head(key)).await {
        Ok(Ok(meta)) => size = Some(meta.size),
        Ok(Err(e)) if e.is_not_found() => {
            debug!(key, "Object not found during metadata read");
            absent = true;
        }
        Ok(Err(e)) => warn!(key, error = %e, "Failed to read object size"),
        Err(_) => warn!(key, timeout = ?call_timeout, "Timed out reading object size"),
    }

    // Delete even after a not-found head so a racing writer cannot leave the
    // object behind; S3 deletes of missing keys succeed.
    match tokio::time::timeout(call_timeout, store.delete(key)).await {
        Ok(Ok(())) if absent => DeletionOutcome::AlreadyAbsent,
        Ok(Ok(())) => DeletionOutcome::Deleted {
            size: size.unwrap_or(0),
        },
        Ok(Err(e)) if e.is_not_found() => DeletionOutcome::AlreadyAbsent,
        Ok(Err(e)) => DeletionOutcome::Failed(e.to_string()),
        Err(_) => DeletionOutcome::Failed(StorageError::Timeout(call_timeout).to_string()),
    }
}
