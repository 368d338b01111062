//! Parsing and repair of complexity-analysis responses.
//!
//! Models wrap the JSON we ask for in prose or markdown fences often enough
//! that the raw text is never parsed directly. [`extract_json_payload`] peels
//! the payload out, [`parse_complexity_response`] validates it, and
//! [`reconcile`] guarantees one entry per requested task.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::schemas::{ComplexityAnalysisEntry, SubtaskBand};
use crate::entities::{deserialize_numeric_id, Task};
use crate::errors::{TasksError, TasksResult};

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").unwrap());

/// Locate the JSON payload inside generated text.
///
/// Order: fenced block interior, then the span from the first `[` to the
/// last `]`, then the trimmed text unchanged.
pub fn extract_json_payload(raw: &str) -> &str {
    let text = raw.trim();

    if let Some(inner) = FENCED_BLOCK.captures(text).and_then(|c| c.get(1)) {
        return inner.as_str().trim();
    }

    if let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) {
        if start < end {
            return &text[start..=end];
        }
    }

    text
}

/// Entry as the model wrote it; validated into [`ComplexityAnalysisEntry`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    #[serde(deserialize_with = "deserialize_numeric_id")]
    task_id: u32,
    #[serde(default)]
    task_title: String,
    complexity_score: f64,
    #[serde(default)]
    recommended_subtasks: Option<f64>,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    expansion_prompt: String,
}

impl RawEntry {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn into_entry(self) -> ComplexityAnalysisEntry {
        let score = self.complexity_score.clamp(1.0, 10.0);
        let recommended = self
            .recommended_subtasks
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map_or_else(
                || SubtaskBand::for_score(score).default_subtasks(),
                |n| n.round() as u32,
            );

        ComplexityAnalysisEntry {
            task_id: self.task_id,
            task_title: self.task_title,
            complexity_score: score,
            recommended_subtasks: recommended,
            reasoning: self.reasoning,
            expansion_prompt: self.expansion_prompt,
        }
    }
}

/// Parse generated text into complexity entries.
///
/// Malformed JSON is fatal. Individual entries that fail validation are
/// dropped with a warning so [`reconcile`] can backfill them.
pub fn parse_complexity_response(raw: &str) -> TasksResult<Vec<ComplexityAnalysisEntry>> {
    let payload = extract_json_payload(raw);

    let value: Value =
        serde_json::from_str(payload).map_err(|e| TasksError::AiResponseParseError {
            reason: e.to_string(),
        })?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("complexityAnalysis") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(TasksError::AiResponseParseError {
                    reason: "expected a JSON array of analysis entries, found an object".to_string(),
                })
            }
        },
        other => {
            return Err(TasksError::AiResponseParseError {
                reason: format!("expected a JSON array of analysis entries, found {other}"),
            })
        }
    };

    let mut entries = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<RawEntry>(item) {
            Ok(raw) if raw.complexity_score.is_finite() => entries.push(raw.into_entry()),
            Ok(raw) => {
                tracing::warn!(task_id = raw.task_id, "Dropping analysis entry with non-finite score");
            }
            Err(e) => {
                tracing::warn!(index, error = %e, "Dropping malformed analysis entry");
            }
        }
    }

    Ok(entries)
}

/// Result of reconciling parsed entries against the requested task set.
#[derive(Debug, Clone, Default)]
pub struct Reconciled {
    /// One entry per requested task, in request order
    pub entries: Vec<ComplexityAnalysisEntry>,
    /// Requested ids the response did not cover
    pub synthesized: Vec<u32>,
    /// Ids in the response that were never requested
    pub unexpected: Vec<u32>,
}

/// Make the entries cover exactly the requested tasks.
pub fn reconcile(requested: &[Task], parsed: Vec<ComplexityAnalysisEntry>) -> Reconciled {
    let mut by_id: HashMap<u32, ComplexityAnalysisEntry> = HashMap::new();
    let mut unexpected = Vec::new();

    for entry in parsed {
        if requested.iter().any(|t| t.id == entry.task_id) {
            by_id.insert(entry.task_id, entry);
        } else if !unexpected.contains(&entry.task_id) {
            unexpected.push(entry.task_id);
        }
    }

    let mut reconciled = Reconciled {
        unexpected,
        ..Reconciled::default()
    };

    for task in requested {
        if reconciled.entries.iter().any(|e| e.task_id == task.id) {
            continue;
        }
        let entry = match by_id.remove(&task.id) {
            Some(mut entry) => {
                if entry.task_title.trim().is_empty() {
                    entry.task_title.clone_from(&task.title);
                }
                entry
            }
            None => {
                reconciled.synthesized.push(task.id);
                ComplexityAnalysisEntry::fallback(task.id, &task.title)
            }
        };
        reconciled.entries.push(entry);
    }

    if !reconciled.synthesized.is_empty() {
        tracing::warn!(
            missing = ?reconciled.synthesized,
            "Analysis response omitted tasks; added default entries"
        );
    }
    if !reconciled.unexpected.is_empty() {
        tracing::warn!(
            ids = ?reconciled.unexpected,
            "Analysis response included tasks that were not requested; ignoring them"
        );
    }

    reconciled
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    const ENTRY_JSON: &str = r#"[{"taskId": 1, "taskTitle": "Auth", "complexityScore": 7.5, "recommendedSubtasks": 6, "reasoning": "OAuth flows", "expansionPrompt": "Split by provider"}]"#;

    #[test]
    fn test_plain_array() {
        let entries = parse_complexity_response(ENTRY_JSON).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].task_id, 1);
        assert_eq!(entries[0].recommended_subtasks, 6);
    }

    #[test]
    fn test_fenced_block_with_commentary() {
        let raw = format!("Here is the analysis you asked for:\n\n```json\n{ENTRY_JSON}\n```\n\nLet me know!");
        assert_eq!(extract_json_payload(&raw), ENTRY_JSON);
        assert_eq!(parse_complexity_response(&raw).unwrap().len(), 1);
    }

    #[test]
    fn test_bare_fence() {
        let raw = format!("```\n{ENTRY_JSON}\n```");
        assert_eq!(parse_complexity_response(&raw).unwrap()[0].task_title, "Auth");
    }

    #[test]
    fn test_bracket_slice_with_prose() {
        let raw = format!("Sure! {ENTRY_JSON} Hope that helps.");
        assert_eq!(extract_json_payload(&raw), ENTRY_JSON);
    }

    #[test]
    fn test_wrapped_object_accepted() {
        let raw = format!(r#"{{"complexityAnalysis": {ENTRY_JSON}}}"#);
        // The bracket slice already isolates the array; the object form also parses
        assert_eq!(parse_complexity_response(&raw).unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_json_surfaces_parser_error() {
        let err = parse_complexity_response("I could not analyze these tasks.").unwrap_err();
        match err {
            TasksError::AiResponseParseError { reason } => assert!(reason.contains("expected")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_truncated_array_is_fatal() {
        let raw = r#"[{"taskId": 1, "complexityScore": 5"#;
        assert!(matches!(
            parse_complexity_response(raw),
            Err(TasksError::AiResponseParseError { .. })
        ));
    }

    #[test]
    fn test_scalar_payload_rejected() {
        assert!(parse_complexity_response("42").is_err());
    }

    #[test]
    fn test_entry_normalisation() {
        let raw = r#"[
            {"taskId": "2", "complexityScore": 14, "reasoning": "huge"},
            {"taskId": 3, "complexityScore": 7.85, "recommendedSubtasks": 5.6},
            {"taskId": 0, "complexityScore": 3},
            {"taskTitle": "no id", "complexityScore": 3}
        ]"#;
        let entries = parse_complexity_response(raw).unwrap();
        assert_eq!(entries.len(), 2);
        assert!((entries[0].complexity_score - 10.0).abs() < f64::EPSILON);
        assert_eq!(entries[0].recommended_subtasks, 9);
        assert_eq!(entries[1].recommended_subtasks, 6);
    }

    #[test]
    fn test_reconcile_backfills_missing() {
        let tasks = vec![
            Task::new(1, "Auth", ""),
            Task::new(2, "Billing", ""),
            Task::new(4, "Search", ""),
        ];
        let parsed = parse_complexity_response(ENTRY_JSON).unwrap();

        let reconciled = reconcile(&tasks, parsed);
        let ids: BTreeSet<_> = reconciled.entries.iter().map(|e| e.task_id).collect();
        assert_eq!(ids, BTreeSet::from([1, 2, 4]));
        assert_eq!(reconciled.synthesized, vec![2, 4]);

        let billing = reconciled.entries.iter().find(|e| e.task_id == 2).unwrap();
        assert!(billing.expansion_prompt.contains("Billing"));
        assert!((billing.complexity_score - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reconcile_drops_unrequested_and_fills_titles() {
        let tasks = vec![Task::new(3, "Search index", "")];
        let parsed = vec![
            ComplexityAnalysisEntry {
                task_title: String::new(),
                ..ComplexityAnalysisEntry::fallback(3, "")
            },
            ComplexityAnalysisEntry::fallback(8, "Ghost"),
        ];

        let reconciled = reconcile(&tasks, parsed);
        assert_eq!(reconciled.entries.len(), 1);
        assert_eq!(reconciled.entries[0].task_title, "Search index");
        assert_eq!(reconciled.unexpected, vec![8]);
        assert!(reconciled.synthesized.is_empty());
    }

    #[test]
    fn test_reconcile_empty_response_covers_everything() {
        let tasks = vec![Task::new(1, "A", ""), Task::new(2, "B", "")];
        let reconciled = reconcile(&tasks, Vec::new());
        assert_eq!(reconciled.entries.len(), 2);
        assert_eq!(reconciled.synthesized, vec![1, 2]);
    }
}
