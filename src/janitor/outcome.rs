use serde::{Deserialize, Serialize};

/// Summary of one reconciliation run, as returned by `POST /cleanup`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// True when no candidate failed.
    pub success: bool,
    pub deleted_count: u64,
    pub failed_count: u64,
    pub skipped_count: u64,
    /// Sum of object sizes observed before deletion.
    pub total_size_bytes: u64,
    /// Deleted storage keys in processing order, truncated to the configured
    /// cap. `deleted_count` is the true total.
    pub deleted_files: Vec<String>,
    pub failed_files: Vec<FailedFile>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFile {
    pub file_path: String,
    pub error: String,
}

/// Accumulates per-candidate results for one run.
#[derive(Debug)]
pub(crate) struct OutcomeBuilder {
    deleted_count: u64,
    failed_count: u64,
    skipped_count: u64,
    total_size_bytes: u64,
    deleted_files: Vec<String>,
    failed_files: Vec<FailedFile>,
    deleted_files_cap: usize,
    dry_run: bool,
}

impl OutcomeBuilder {
    pub(crate) fn new(deleted_files_cap: usize, dry_run: bool) -> Self {
        Self {
            deleted_count: 0,
            failed_count: 0,
            skipped_count: 0,
            total_size_bytes: 0,
            deleted_files: Vec::new(),
            failed_files: Vec::new(),
            deleted_files_cap,
            dry_run,
        }
    }

    pub(crate) fn record_deleted(&mut self, key: &str, size: u64) {
        self.deleted_count += 1;
        self.total_size_bytes = self.total_size_bytes.saturating_add(size);
        if self.deleted_files.len() < self.deleted_files_cap {
            self.deleted_files.push(key.to_string());
        }
    }

    pub(crate) fn record_skipped(&mut self) {
        self.skipped_count += 1;
    }

    pub(crate) fn record_failed(&mut self, key: &str, error: String) {
        self.failed_count += 1;
        self.failed_files.push(FailedFile {
            file_path: key.to_string(),
            error,
        });
    }

    pub(crate) fn finish(self) -> BatchOutcome {
        let summary = format!(
            "Cleanup complete: {} deleted, {} failed, {} skipped",
            self.deleted_count, self.failed_count, self.skipped_count
        );
        BatchOutcome {
            success: self.failed_count == 0,
            deleted_count: self.deleted_count,
            failed_count: self.failed_count,
            skipped_count: self.skipped_count,
            total_size_bytes: self.total_size_bytes,
            deleted_files: self.deleted_files,
            failed_files: self.failed_files,
            message: if self.dry_run {
                format!("DRY RUN: {summary}")
            } else {
                summary
            },
        }
    }
}
