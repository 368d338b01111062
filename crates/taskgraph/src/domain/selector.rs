//! Choosing which tasks an analysis run covers.

use std::collections::HashSet;

use crate::entities::Task;
use crate::errors::{TasksError, TasksResult};

/// Which tasks to analyze.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TaskSelection {
    /// Every active task
    #[default]
    All,
    /// Only these task ids
    Ids(Vec<u32>),
    /// Inclusive id range; open ends default to 1 and the highest task id
    Range { from: Option<u32>, to: Option<u32> },
}

impl TaskSelection {
    /// Build a selection from CLI arguments.
    ///
    /// An id list wins over a range. Ids are comma separated (`"1,3,5"`).
    pub fn from_cli(ids: Option<&str>, from: Option<u32>, to: Option<u32>) -> TasksResult<Self> {
        if let Some(raw) = ids.filter(|s| !s.trim().is_empty()) {
            let ids = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<u32>()
                        .ok()
                        .filter(|id| *id > 0)
                        .ok_or_else(|| TasksError::InvalidArgument {
                            reason: format!("'{s}' is not a valid task id"),
                        })
                })
                .collect::<TasksResult<Vec<_>>>()?;
            return Ok(Self::Ids(ids));
        }

        if from.is_some() || to.is_some() {
            if let (Some(from), Some(to)) = (from, to) {
                if from > to {
                    return Err(TasksError::InvalidArgument {
                        reason: format!("--from {from} is greater than --to {to}"),
                    });
                }
            }
            return Ok(Self::Range { from, to });
        }

        Ok(Self::All)
    }
}

/// Tasks chosen for a run.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub tasks: Vec<Task>,
    /// Size of the collection before filtering
    pub original_count: usize,
    /// Requested ids that are absent or not active
    pub missing_ids: Vec<u32>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn ids(&self) -> Vec<u32> {
        self.tasks.iter().map(|t| t.id).collect()
    }
}

/// Apply the status filter, then the selection.
pub fn select_tasks(tasks: &[Task], selection: &TaskSelection) -> Selection {
    let original_count = tasks.len();
    let active = tasks.iter().filter(|t| t.is_active());

    let (chosen, missing_ids): (Vec<Task>, Vec<u32>) = match selection {
        TaskSelection::All => (active.cloned().collect(), Vec::new()),
        TaskSelection::Ids(ids) => {
            let chosen: Vec<Task> = active.filter(|t| ids.contains(&t.id)).cloned().collect();
            let mut seen = HashSet::new();
            let missing: Vec<u32> = ids
                .iter()
                .copied()
                .filter(|id| !chosen.iter().any(|t| t.id == *id))
                .filter(|id| seen.insert(*id))
                .collect();
            (chosen, missing)
        }
        TaskSelection::Range { from, to } => {
            let from = from.unwrap_or(1);
            let to = to.unwrap_or_else(|| tasks.iter().map(|t| t.id).max().unwrap_or(0));
            let chosen = active
                .filter(|t| (from..=to).contains(&t.id))
                .cloned()
                .collect();
            (chosen, Vec::new())
        }
    };

    if !missing_ids.is_empty() {
        tracing::warn!(
            missing = ?missing_ids,
            "Requested tasks were not found or are not pending, blocked or in progress"
        );
    }

    tracing::debug!(
        selected = chosen.len(),
        original_count,
        "Filtered tasks for analysis"
    );

    Selection {
        tasks: chosen,
        original_count,
        missing_ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::TaskStatus;

    fn tasks() -> Vec<Task> {
        vec![
            Task::new(1, "A", "").with_status(TaskStatus::Done),
            Task::new(2, "B", ""),
            Task::new(3, "C", "").with_status(TaskStatus::Blocked),
            Task::new(4, "D", "").with_status(TaskStatus::InProgress),
            Task::new(5, "E", "").with_status(TaskStatus::Deferred),
            Task::new(6, "F", "").with_status(TaskStatus::Review),
        ]
    }

    #[test]
    fn test_status_filter() {
        let selection = select_tasks(
            &[
                Task::new(1, "A", "").with_status(TaskStatus::Done),
                Task::new(2, "B", ""),
            ],
            &TaskSelection::All,
        );
        assert_eq!(selection.ids(), vec![2]);
        assert_eq!(selection.original_count, 2);
    }

    #[test]
    fn test_all_keeps_active_statuses() {
        assert_eq!(select_tasks(&tasks(), &TaskSelection::All).ids(), vec![2, 3, 4]);
    }

    #[test]
    fn test_ids_report_missing() {
        let all = vec![Task::new(1, "A", ""), Task::new(2, "B", "")];
        let selection = select_tasks(&all, &TaskSelection::Ids(vec![2, 9]));
        assert_eq!(selection.ids(), vec![2]);
        assert_eq!(selection.missing_ids, vec![9]);
    }

    #[test]
    fn test_ids_for_inactive_tasks_are_missing() {
        let selection = select_tasks(&tasks(), &TaskSelection::Ids(vec![1, 2, 6]));
        assert_eq!(selection.ids(), vec![2]);
        assert_eq!(selection.missing_ids, vec![1, 6]);
    }

    #[test]
    fn test_repeated_missing_ids_reported_once() {
        let all = vec![Task::new(1, "A", "")];
        let selection = select_tasks(&all, &TaskSelection::Ids(vec![9, 8, 9, 1, 8]));
        assert_eq!(selection.ids(), vec![1]);
        assert_eq!(selection.missing_ids, vec![9, 8]);
    }

    #[test]
    fn test_unknown_status_is_filtered_out() {
        let all = vec![
            Task::new(1, "A", "").with_status(TaskStatus::Other("todo".to_string())),
            Task::new(2, "B", ""),
        ];
        let selection = select_tasks(&all, &TaskSelection::Ids(vec![1, 2]));
        assert_eq!(selection.ids(), vec![2]);
        assert_eq!(selection.missing_ids, vec![1]);
    }

    #[test]
    fn test_range_defaults_to_prefilter_max() {
        // Task 6 is inactive but still sets the upper bound
        let selection = select_tasks(&tasks(), &TaskSelection::Range { from: Some(3), to: None });
        assert_eq!(selection.ids(), vec![3, 4]);

        let selection = select_tasks(&tasks(), &TaskSelection::Range { from: None, to: Some(3) });
        assert_eq!(selection.ids(), vec![2, 3]);
        assert_eq!(selection.original_count, 6);
    }

    #[test]
    fn test_empty_collection() {
        let selection = select_tasks(&[], &TaskSelection::Range { from: None, to: None });
        assert!(selection.is_empty());
        assert_eq!(selection.original_count, 0);
    }

    #[test]
    fn test_from_cli() {
        assert_eq!(
            TaskSelection::from_cli(Some("1, 3,5"), Some(2), None).unwrap(),
            TaskSelection::Ids(vec![1, 3, 5])
        );
        assert_eq!(
            TaskSelection::from_cli(None, None, Some(4)).unwrap(),
            TaskSelection::Range { from: None, to: Some(4) }
        );
        assert_eq!(TaskSelection::from_cli(Some(""), None, None).unwrap(), TaskSelection::All);
        assert!(TaskSelection::from_cli(Some("1,x"), None, None).is_err());
        assert!(TaskSelection::from_cli(Some("0"), None, None).is_err());
        assert!(TaskSelection::from_cli(None, Some(5), Some(2)).is_err());
    }
}
