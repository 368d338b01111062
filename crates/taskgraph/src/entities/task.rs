//! Task entity and related types.

use serde::{Deserialize, Deserializer, Serialize};

use super::{Subtask, TaskIdentifier};

/// Task status values.
///
/// Statuses this crate does not know are kept verbatim as `Other` and are
/// never active.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "Option<String>", into = "String")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Done,
    Deferred,
    Cancelled,
    Blocked,
    Review,
    Other(String),
}

impl TaskStatus {
    /// Whether a task in this status is still open for analysis.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Blocked | Self::InProgress)
    }

    /// Case-insensitive parse; empty means pending.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "pending" | "" => Self::Pending,
            "in-progress" | "inprogress" | "in_progress" => Self::InProgress,
            "done" | "completed" => Self::Done,
            "deferred" => Self::Deferred,
            "cancelled" | "canceled" => Self::Cancelled,
            "blocked" => Self::Blocked,
            "review" => Self::Review,
            _ => Self::Other(raw.trim().to_string()),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in-progress"),
            Self::Done => write!(f, "done"),
            Self::Deferred => write!(f, "deferred"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Blocked => write!(f, "blocked"),
            Self::Review => write!(f, "review"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

impl From<Option<String>> for TaskStatus {
    fn from(value: Option<String>) -> Self {
        value.as_deref().map_or_else(Self::default, Self::parse_lenient)
    }
}

impl From<TaskStatus> for String {
    fn from(value: TaskStatus) -> Self {
        value.to_string()
    }
}

/// Task priority levels. Missing or unrecognised values read as medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "Option<String>", into = "String")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

impl From<Option<String>> for TaskPriority {
    fn from(value: Option<String>) -> Self {
        match value.as_deref().map(|s| s.trim().to_lowercase()).as_deref() {
            Some("low") => Self::Low,
            Some("high") => Self::High,
            Some("critical" | "crit") => Self::Critical,
            _ => Self::Medium,
        }
    }
}

impl From<TaskPriority> for String {
    fn from(value: TaskPriority) -> Self {
        value.to_string()
    }
}

/// An id as it appears on disk: `3` or `"3"` or `"3.1"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.trim().to_string(),
        }
    }
}

/// Accept a positive integer id written either as a number or a numeric string.
pub(crate) fn deserialize_numeric_id<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = RawId::deserialize(deserializer)?.into_string();
    match raw.parse::<u32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(serde::de::Error::custom(format!(
            "invalid task id '{raw}': expected a positive integer"
        ))),
    }
}

/// Accept dependency lists mixing numbers and strings, normalising to strings.
pub(crate) fn deserialize_dependencies<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<RawId>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(RawId::into_string)
        .collect())
}

/// Core task structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Positive integer identifier
    #[serde(deserialize_with = "deserialize_numeric_id")]
    pub id: u32,

    /// Brief, descriptive title
    pub title: String,

    /// Concise description of what the task involves
    #[serde(default)]
    pub description: String,

    /// Current task status
    #[serde(default)]
    pub status: TaskStatus,

    /// Task priority level
    #[serde(default)]
    pub priority: TaskPriority,

    /// Identifiers of prerequisite tasks or subtasks
    #[serde(default, deserialize_with = "deserialize_dependencies")]
    pub dependencies: Vec<String>,

    /// In-depth implementation instructions
    #[serde(default)]
    pub details: String,

    /// Verification approach
    #[serde(default, rename = "testStrategy", skip_serializing_if = "String::is_empty")]
    pub test_strategy: String,

    /// List of subtasks
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<Subtask>,
}

impl Task {
    /// Create a new task with minimal required fields
    pub fn new(id: u32, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            status: TaskStatus::default(),
            priority: TaskPriority::default(),
            dependencies: Vec::new(),
            details: String::new(),
            test_strategy: String::new(),
            subtasks: Vec::new(),
        }
    }

    /// Builder-style dependency setter, mostly for tests and fixtures.
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Builder-style status setter.
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn identifier(&self) -> TaskIdentifier {
        TaskIdentifier::task(self.id)
    }

    /// Whether this task is still open for complexity analysis
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Get subtask by ID
    pub fn get_subtask(&self, subtask_id: u32) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == subtask_id)
    }

    /// Add a subtask
    pub fn add_subtask(&mut self, subtask: Subtask) {
        self.subtasks.push(subtask);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_new() {
        let task = Task::new(1, "Test Task", "A test task description");
        assert_eq!(task.id, 1);
        assert_eq!(task.title, "Test Task");
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.identifier().to_string(), "1");
    }

    #[test]
    fn test_task_status_parsing() {
        assert_eq!(TaskStatus::parse_lenient("pending"), TaskStatus::Pending);
        assert_eq!(
            TaskStatus::parse_lenient("In-Progress"),
            TaskStatus::InProgress
        );
        assert_eq!(TaskStatus::parse_lenient("DONE"), TaskStatus::Done);
        assert_eq!(
            TaskStatus::parse_lenient("todo"),
            TaskStatus::Other("todo".to_string())
        );
    }

    #[test]
    fn test_active_statuses() {
        assert!(TaskStatus::Pending.is_active());
        assert!(TaskStatus::Blocked.is_active());
        assert!(TaskStatus::InProgress.is_active());
        assert!(!TaskStatus::Done.is_active());
        assert!(!TaskStatus::Review.is_active());
        assert!(!TaskStatus::Deferred.is_active());
        assert!(!TaskStatus::Cancelled.is_active());
        assert!(!TaskStatus::Other("todo".to_string()).is_active());
    }

    #[test]
    fn test_deserialize_tolerant_task() {
        let task: Task = serde_json::from_str(
            r#"{"id": "7", "title": "Wire up auth", "status": "In-Progress", "dependencies": [1, "2", "3.1"]}"#,
        )
        .unwrap();
        assert_eq!(task.id, 7);
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.dependencies, vec!["1", "2", "3.1"]);
        assert!(task.subtasks.is_empty());
    }

    #[test]
    fn test_missing_status_defaults_to_pending() {
        let task: Task = serde_json::from_str(r#"{"id": 2, "title": "T", "dependencies": null}"#).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.dependencies.is_empty());
    }

    #[test]
    fn test_null_status_reads_as_pending() {
        let task: Task =
            serde_json::from_str(r#"{"id": 1, "title": "T", "status": null, "priority": null}"#)
                .unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert!(task.is_active());
    }

    #[test]
    fn test_unknown_status_loads_inactive() {
        let task: Task =
            serde_json::from_str(r#"{"id": 1, "title": "T", "status": "todo", "priority": "urgent"}"#)
                .unwrap();
        assert_eq!(task.status, TaskStatus::Other("todo".to_string()));
        assert!(!task.is_active());
        assert_eq!(serde_json::to_value(&task).unwrap()["status"], "todo");
    }

    #[test]
    fn test_zero_id_rejected() {
        let result = serde_json::from_str::<Task>(r#"{"id": 0, "title": "T"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_status_serializes_kebab_case() {
        let task = Task::new(1, "T", "D").with_status(TaskStatus::InProgress);
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["status"], "in-progress");
        assert_eq!(json["priority"], "medium");
    }
}
