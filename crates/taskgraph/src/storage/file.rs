//! File-based storage implementation.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;

use super::traits::{ReportLock, Storage};
use crate::ai::ComplexityReport;
use crate::entities::Task;
use crate::errors::{TasksError, TasksResult};

/// Tag read from tagged task files when none is chosen.
pub const DEFAULT_TAG: &str = "master";

/// File-based storage implementation
#[derive(Debug, Clone)]
pub struct FileStorage {
    /// Project root path
    project_path: PathBuf,

    /// Path to tasks directory (.tasks/)
    tasks_dir: PathBuf,

    /// Tag used when the tasks file is in tagged layout
    tag: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TasksFormat {
    Standard, // { "tasks": [...], "metadata": {...} }
    Tagged,   // { "master": { "tasks": [...] }, "feature": { "tasks": [...] } }
}

impl FileStorage {
    /// Create a new file storage instance rooted at `project_path`.
    ///
    /// Uses the `.tasks/` directory for task files and reports.
    pub fn new(project_path: impl AsRef<Path>) -> Self {
        let project_path = project_path.as_ref().to_path_buf();
        let tasks_dir = project_path.join(".tasks");

        Self {
            project_path,
            tasks_dir,
            tag: DEFAULT_TAG.to_string(),
        }
    }

    /// Read a different tag from tagged task files.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn project_path(&self) -> &Path {
        &self.project_path
    }

    /// Default tasks file (`.tasks/tasks/tasks.json`)
    pub fn tasks_file(&self) -> PathBuf {
        self.tasks_dir.join("tasks").join("tasks.json")
    }

    /// Default report file (`.tasks/reports/task-complexity-report.json`)
    pub fn report_file(&self) -> PathBuf {
        self.tasks_dir
            .join("reports")
            .join("task-complexity-report.json")
    }

    /// Config file (`.tasks/config.json`)
    pub fn config_file(&self) -> PathBuf {
        self.tasks_dir.join("config.json")
    }

    /// Resolve a user-supplied path against the project root.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_path.join(path)
        }
    }

    /// Detect format of tasks.json (standard vs tagged)
    fn detect_format(data: &Value) -> Option<TasksFormat> {
        let obj = data.as_object()?;
        if obj.get("tasks").is_some_and(Value::is_array) {
            return Some(TasksFormat::Standard);
        }
        // Tagged layout: every tag maps to an object with its own task list
        let tagged = obj
            .values()
            .any(|v| v.get("tasks").is_some_and(Value::is_array));
        tagged.then_some(TasksFormat::Tagged)
    }

    fn extract_tasks(&self, path: &Path, data: Value) -> TasksResult<Vec<Task>> {
        let invalid = |reason: String| TasksError::InvalidTasksFile {
            path: path.display().to_string(),
            reason,
        };

        let list = match Self::detect_format(&data) {
            Some(TasksFormat::Standard) => data.get("tasks").cloned(),
            Some(TasksFormat::Tagged) => {
                let list = data.get(&self.tag).and_then(|t| t.get("tasks")).cloned();
                if list.is_none() {
                    return Err(invalid(format!("tag '{}' not found", self.tag)));
                }
                list
            }
            None => None,
        }
        .ok_or_else(|| invalid("missing \"tasks\" array".to_string()))?;

        serde_json::from_value(list).map_err(|e| invalid(e.to_string()))
    }

    fn lock_path_for(path: &Path) -> PathBuf {
        let mut name = path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".lock");
        path.with_file_name(name)
    }

    /// Write `content` next to `path` and rename it into place.
    fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(content)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn load_tasks(&self, path: &Path) -> TasksResult<Vec<Task>> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| TasksError::FileReadError {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let data: Value = serde_json::from_str(&content)?;
        let tasks = self.extract_tasks(path, data)?;

        tracing::debug!(path = %path.display(), count = tasks.len(), "Loaded tasks");
        Ok(tasks)
    }

    async fn load_report(&self, path: &Path) -> TasksResult<Option<ComplexityReport>> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TasksError::FileReadError {
                path: path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn save_report(&self, path: &Path, report: &ComplexityReport) -> TasksResult<()> {
        let content = serde_json::to_string_pretty(report)?;
        let target = path.to_path_buf();

        tokio::task::spawn_blocking(move || Self::write_atomic(&target, content.as_bytes()))
            .await
            .map_err(|e| TasksError::Internal {
                reason: format!("report writer panicked: {e}"),
            })?
            .map_err(|e| TasksError::FileWriteError {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(path = %path.display(), entries = report.complexity_analysis.len(), "Saved report");
        Ok(())
    }

    async fn lock_report(&self, path: &Path) -> TasksResult<ReportLock> {
        let lock_path = Self::lock_path_for(path);
        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .await
        {
            Ok(_) => Ok(ReportLock::new(lock_path)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(TasksError::ReportLocked {
                    path: path.display().to_string(),
                })
            }
            Err(e) => Err(TasksError::FileWriteError {
                path: lock_path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
