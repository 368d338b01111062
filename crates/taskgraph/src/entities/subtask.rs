//! Subtask entity.

use serde::{Deserialize, Serialize};

use super::task::{deserialize_dependencies, deserialize_numeric_id, TaskStatus};
use super::TaskIdentifier;

/// Subtask structure (nested within tasks)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    /// Numeric ID within parent task
    #[serde(deserialize_with = "deserialize_numeric_id")]
    pub id: u32,

    /// Brief, descriptive title
    pub title: String,

    /// Concise description
    #[serde(default)]
    pub description: String,

    /// Current status
    #[serde(default)]
    pub status: TaskStatus,

    /// Dependencies: bare numbers name sibling subtasks, dotted ids anything
    #[serde(default, deserialize_with = "deserialize_dependencies")]
    pub dependencies: Vec<String>,

    /// Implementation details
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
}

impl Subtask {
    /// Create a new subtask
    pub fn new(id: u32, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            status: TaskStatus::default(),
            dependencies: Vec::new(),
            details: String::new(),
        }
    }

    /// Builder-style dependency setter.
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Full identifier (`parent.id`)
    pub fn full_id(&self, parent_id: u32) -> TaskIdentifier {
        TaskIdentifier::subtask(parent_id, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtask_new() {
        let subtask = Subtask::new(1, "Subtask Title", "Subtask description");
        assert_eq!(subtask.id, 1);
        assert_eq!(subtask.title, "Subtask Title");
        assert_eq!(subtask.status, TaskStatus::Pending);
    }

    #[test]
    fn test_subtask_full_id() {
        let subtask = Subtask::new(2, "Sub", "Desc");
        assert_eq!(subtask.full_id(5).to_string(), "5.2");
    }

    #[test]
    fn test_subtask_mixed_dependencies() {
        let subtask: Subtask =
            serde_json::from_str(r#"{"id": 3, "title": "S", "dependencies": [1, "4.2"]}"#).unwrap();
        assert_eq!(subtask.dependencies, vec!["1", "4.2"]);
    }
}
