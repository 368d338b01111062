//! Storage trait definitions.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::ai::ComplexityReport;
use crate::entities::Task;
use crate::errors::TasksResult;

/// Exclusive hold on a report path for one read-merge-write cycle.
///
/// The lock file is removed when the guard is dropped.
#[derive(Debug)]
pub struct ReportLock {
    lock_path: PathBuf,
}

impl ReportLock {
    pub(crate) fn new(lock_path: PathBuf) -> Self {
        Self { lock_path }
    }

    /// Path of the lock file backing this guard.
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for ReportLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.lock_path) {
            tracing::warn!(path = %self.lock_path.display(), error = %e, "Failed to remove report lock");
        }
    }
}

/// Storage interface for tasks and complexity reports
#[async_trait]
pub trait Storage: Send + Sync {
    /// Load the task collection from `path`.
    async fn load_tasks(&self, path: &Path) -> TasksResult<Vec<Task>>;

    /// Load a complexity report. `Ok(None)` when no report exists yet.
    async fn load_report(&self, path: &Path) -> TasksResult<Option<ComplexityReport>>;

    /// Persist a complexity report atomically.
    async fn save_report(&self, path: &Path, report: &ComplexityReport) -> TasksResult<()>;

    /// Take the exclusive lock guarding read-merge-write on `path`.
    async fn lock_report(&self, path: &Path) -> TasksResult<ReportLock>;
}
