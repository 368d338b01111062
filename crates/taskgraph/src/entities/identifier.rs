//! Hierarchical task identifiers.
//!
//! Identifiers are dot-separated positive integers: `5` addresses a task,
//! `5.3` a subtask of task 5 and `5.3.1` a sub-subtask.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::TasksError;

/// Segments are positive integers without leading zeros.
static IDENTIFIER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9][0-9]*(\.[1-9][0-9]*)*$").unwrap());

/// Breakdown of a raw identifier string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierInfo {
    pub is_valid: bool,
    pub is_main_task: bool,
    pub is_subtask: bool,
    pub is_sub_subtask: bool,
    /// Number of segments (0 when invalid)
    pub level: usize,
    pub parts: Vec<u64>,
    /// Identifier with the last segment removed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl IdentifierInfo {
    fn invalid() -> Self {
        Self {
            is_valid: false,
            is_main_task: false,
            is_subtask: false,
            is_sub_subtask: false,
            level: 0,
            parts: Vec::new(),
            parent: None,
        }
    }
}

/// Parse a raw identifier. Never fails; invalid input yields `is_valid == false`.
pub fn parse_identifier(raw: &str) -> IdentifierInfo {
    if !IDENTIFIER_PATTERN.is_match(raw) {
        return IdentifierInfo::invalid();
    }

    let Ok(parts) = raw
        .split('.')
        .map(str::parse::<u64>)
        .collect::<Result<Vec<_>, _>>()
    else {
        // Segment too large to address anything
        return IdentifierInfo::invalid();
    };

    let level = parts.len();
    let parent = raw.rsplit_once('.').map(|(parent, _)| parent.to_string());

    IdentifierInfo {
        is_valid: true,
        is_main_task: level == 1,
        is_subtask: level == 2,
        is_sub_subtask: level == 3,
        level,
        parts,
        parent,
    }
}

/// A validated task, subtask or sub-subtask identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskIdentifier {
    parts: Vec<u64>,
}

impl TaskIdentifier {
    /// Identifier of a top-level task.
    pub fn task(id: u32) -> Self {
        Self {
            parts: vec![u64::from(id)],
        }
    }

    /// Identifier of a subtask within a top-level task.
    pub fn subtask(parent: u32, id: u32) -> Self {
        Self {
            parts: vec![u64::from(parent), u64::from(id)],
        }
    }

    pub fn level(&self) -> usize {
        self.parts.len()
    }

    pub fn parts(&self) -> &[u64] {
        &self.parts
    }

    pub fn is_main_task(&self) -> bool {
        self.level() == 1
    }

    pub fn is_subtask(&self) -> bool {
        self.level() == 2
    }

    /// Identifier with the last segment removed, `None` for top-level tasks.
    pub fn parent(&self) -> Option<Self> {
        if self.parts.len() > 1 {
            Some(Self {
                parts: self.parts[..self.parts.len() - 1].to_vec(),
            })
        } else {
            None
        }
    }

    /// Top-level task id this identifier belongs to.
    pub fn root(&self) -> u64 {
        self.parts[0]
    }
}

impl FromStr for TaskIdentifier {
    type Err = TasksError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let info = parse_identifier(s);
        if info.is_valid {
            Ok(Self { parts: info.parts })
        } else {
            Err(TasksError::InvalidId { id: s.to_string() })
        }
    }
}

impl TryFrom<String> for TaskIdentifier {
    type Error = TasksError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaskIdentifier> for String {
    fn from(value: TaskIdentifier) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TaskIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_levels() {
        let task = parse_identifier("5");
        assert!(task.is_valid);
        assert!(task.is_main_task);
        assert_eq!(task.level, 1);
        assert_eq!(task.parent, None);

        let subtask = parse_identifier("5.3");
        assert!(subtask.is_subtask);
        assert_eq!(subtask.parts, vec![5, 3]);
        assert_eq!(subtask.parent.as_deref(), Some("5"));

        let nested = parse_identifier("5.3.1");
        assert!(nested.is_sub_subtask);
        assert_eq!(nested.level, 3);
        assert_eq!(nested.parent.as_deref(), Some("5.3"));
    }

    #[test]
    fn test_rejects_zero_and_malformed_segments() {
        for raw in ["0", "0.1", "1.0", "01", "1.02", "", ".", "1.", ".1", "1..2", "a", "1.b", " 1", "-1", "1.2 "] {
            let info = parse_identifier(raw);
            assert!(!info.is_valid, "expected '{raw}' to be invalid");
            assert_eq!(info.level, 0);
            assert!(info.parent.is_none());
        }
    }

    #[test]
    fn test_rejects_non_ascii_digits() {
        // Arabic-indic digit three
        assert!(!parse_identifier("1\u{0663}").is_valid);
    }

    #[test]
    fn test_deep_identifiers_are_valid() {
        let info = parse_identifier("1.2.3.4");
        assert!(info.is_valid);
        assert_eq!(info.level, 4);
        assert!(!info.is_main_task && !info.is_subtask && !info.is_sub_subtask);
        assert_eq!(info.parent.as_deref(), Some("1.2.3"));
    }

    #[test]
    fn test_task_identifier_round_trip() {
        let id: TaskIdentifier = "12.4".parse().unwrap();
        assert_eq!(id, TaskIdentifier::subtask(12, 4));
        assert_eq!(id.to_string(), "12.4");
        assert_eq!(id.parent(), Some(TaskIdentifier::task(12)));
        assert_eq!(id.root(), 12);
        assert!("0.1".parse::<TaskIdentifier>().is_err());
    }

    #[test]
    fn test_task_identifier_serde() {
        let id: TaskIdentifier = serde_json::from_str("\"3.1\"").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"3.1\"");
        assert!(serde_json::from_str::<TaskIdentifier>("\"3.0\"").is_err());
    }
}
