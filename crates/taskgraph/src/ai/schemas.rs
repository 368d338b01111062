//! Complexity report schema, scoring bands and merge semantics.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Score assigned to entries synthesized for tasks the model skipped.
pub const FALLBACK_COMPLEXITY_SCORE: f64 = 5.0;

/// Subtask count assigned to synthesized entries.
pub const FALLBACK_RECOMMENDED_SUBTASKS: u32 = 3;

/// Reasoning text marking an entry as auto-generated.
pub const FALLBACK_REASONING: &str =
    "Auto-generated: the analysis response did not include this task, so a neutral default score was assigned.";

/// Deterministic mapping from a complexity score range to a subtask range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtaskBand {
    pub min_score: u8,
    pub max_score: u8,
    pub min_subtasks: u32,
    pub max_subtasks: u32,
}

/// Score bands, lowest first. Each band owns scores from its `min_score` up
/// to (not including) the next band's `min_score`.
pub const SUBTASK_BANDS: [SubtaskBand; 4] = [
    SubtaskBand {
        min_score: 1,
        max_score: 3,
        min_subtasks: 2,
        max_subtasks: 3,
    },
    SubtaskBand {
        min_score: 4,
        max_score: 6,
        min_subtasks: 3,
        max_subtasks: 5,
    },
    SubtaskBand {
        min_score: 7,
        max_score: 8,
        min_subtasks: 5,
        max_subtasks: 7,
    },
    SubtaskBand {
        min_score: 9,
        max_score: 10,
        min_subtasks: 7,
        max_subtasks: 10,
    },
];

impl SubtaskBand {
    /// Band for a continuous score; out-of-range scores are clamped to 1-10.
    pub fn for_score(score: f64) -> &'static SubtaskBand {
        let score = if score.is_nan() {
            1.0
        } else {
            score.clamp(1.0, 10.0)
        };
        SUBTASK_BANDS
            .iter()
            .rev()
            .find(|band| score >= f64::from(band.min_score))
            .unwrap_or(&SUBTASK_BANDS[0])
    }

    pub fn contains(&self, subtasks: u32) -> bool {
        (self.min_subtasks..=self.max_subtasks).contains(&subtasks)
    }

    /// Subtask count to use when the model gave none.
    pub fn default_subtasks(&self) -> u32 {
        (self.min_subtasks + self.max_subtasks).div_ceil(2)
    }
}

/// Coarse complexity bucket used for report summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
}

impl ComplexityLevel {
    pub fn for_score(score: f64) -> Self {
        if score >= 8.0 {
            Self::High
        } else if score >= 5.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// One task's complexity assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityAnalysisEntry {
    pub task_id: u32,
    pub task_title: String,
    /// Continuous score from 1 to 10
    pub complexity_score: f64,
    pub recommended_subtasks: u32,
    pub reasoning: String,
    pub expansion_prompt: String,
}

impl ComplexityAnalysisEntry {
    /// Neutral entry for a task the model did not analyze.
    pub fn fallback(task_id: u32, task_title: &str) -> Self {
        Self {
            task_id,
            task_title: task_title.to_string(),
            complexity_score: FALLBACK_COMPLEXITY_SCORE,
            recommended_subtasks: FALLBACK_RECOMMENDED_SUBTASKS,
            reasoning: FALLBACK_REASONING.to_string(),
            expansion_prompt: format!(
                "Break down the task \"{task_title}\" into {FALLBACK_RECOMMENDED_SUBTASKS} focused subtasks covering implementation and testing."
            ),
        }
    }

    pub fn band(&self) -> &'static SubtaskBand {
        SubtaskBand::for_score(self.complexity_score)
    }

    pub fn level(&self) -> ComplexityLevel {
        ComplexityLevel::for_score(self.complexity_score)
    }
}

/// Report metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    pub generated_at: DateTime<Utc>,
    /// Tasks analyzed by the run that produced this report
    #[serde(default)]
    pub tasks_analyzed: usize,
    /// Tasks in the collection before filtering
    #[serde(default)]
    pub total_tasks: usize,
    /// Entries in `complexityAnalysis`
    #[serde(default)]
    pub analysis_count: usize,
    pub threshold_score: f64,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub used_research: bool,
}

/// Inputs for report metadata that come from the run rather than the entries.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub tasks_analyzed: usize,
    pub total_tasks: usize,
    pub threshold_score: f64,
    pub project_name: String,
    pub used_research: bool,
}

/// Counts of entries per complexity level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

/// Persisted complexity report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityReport {
    pub meta: ReportMeta,
    #[serde(default)]
    pub complexity_analysis: Vec<ComplexityAnalysisEntry>,
}

impl ComplexityReport {
    /// Build a report stamped now; `analysisCount` follows the entries.
    pub fn new(run: RunSummary, complexity_analysis: Vec<ComplexityAnalysisEntry>) -> Self {
        Self {
            meta: ReportMeta {
                generated_at: Utc::now(),
                tasks_analyzed: run.tasks_analyzed,
                total_tasks: run.total_tasks,
                analysis_count: complexity_analysis.len(),
                threshold_score: run.threshold_score,
                project_name: run.project_name,
                used_research: run.used_research,
            },
            complexity_analysis,
        }
    }

    /// Combine fresh entries with a prior report's entries.
    ///
    /// Prior entries whose id was just analyzed are dropped, everything else
    /// is kept in its original order, and fresh entries follow. Duplicate ids
    /// within `fresh` collapse to the last occurrence.
    pub fn merge_entries(
        prior: &[ComplexityAnalysisEntry],
        fresh: Vec<ComplexityAnalysisEntry>,
    ) -> Vec<ComplexityAnalysisEntry> {
        let fresh = dedup_last_wins(fresh);
        let analyzed: HashSet<u32> = fresh.iter().map(|e| e.task_id).collect();

        prior
            .iter()
            .filter(|e| !analyzed.contains(&e.task_id))
            .cloned()
            .chain(fresh)
            .collect()
    }

    /// Build the report for a run, merging with `prior` when present.
    pub fn merged(
        prior: Option<&ComplexityReport>,
        fresh: Vec<ComplexityAnalysisEntry>,
        run: RunSummary,
    ) -> Self {
        let prior_entries = prior.map_or(&[][..], |r| r.complexity_analysis.as_slice());
        Self::new(run, Self::merge_entries(prior_entries, fresh))
    }

    /// Get the analysis for a task
    pub fn get_task_analysis(&self, task_id: u32) -> Option<&ComplexityAnalysisEntry> {
        self.complexity_analysis
            .iter()
            .find(|a| a.task_id == task_id)
    }

    /// Entries at or above the threshold, most complex first.
    pub fn tasks_needing_expansion(&self) -> Vec<&ComplexityAnalysisEntry> {
        let mut needing: Vec<_> = self
            .complexity_analysis
            .iter()
            .filter(|a| a.complexity_score >= self.meta.threshold_score)
            .collect();
        needing.sort_by(|a, b| b.complexity_score.total_cmp(&a.complexity_score));
        needing
    }

    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for entry in &self.complexity_analysis {
            match entry.level() {
                ComplexityLevel::Low => summary.low += 1,
                ComplexityLevel::Medium => summary.medium += 1,
                ComplexityLevel::High => summary.high += 1,
            }
        }
        summary
    }
}

fn dedup_last_wins(entries: Vec<ComplexityAnalysisEntry>) -> Vec<ComplexityAnalysisEntry> {
    let last_index: HashMap<u32, usize> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| (e.task_id, i))
        .collect();
    entries
        .into_iter()
        .enumerate()
        .filter(|(i, e)| last_index.get(&e.task_id) == Some(i))
        .map(|(_, e)| e)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(task_id: u32, score: f64) -> ComplexityAnalysisEntry {
        ComplexityAnalysisEntry {
            task_id,
            task_title: format!("Task {task_id}"),
            complexity_score: score,
            recommended_subtasks: SubtaskBand::for_score(score).default_subtasks(),
            reasoning: "r".to_string(),
            expansion_prompt: "p".to_string(),
        }
    }

    fn run() -> RunSummary {
        RunSummary {
            tasks_analyzed: 1,
            total_tasks: 3,
            threshold_score: 5.0,
            project_name: "demo".to_string(),
            used_research: false,
        }
    }

    fn report(entries: Vec<ComplexityAnalysisEntry>) -> ComplexityReport {
        ComplexityReport::new(run(), entries)
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(SubtaskBand::for_score(1.0).min_subtasks, 2);
        assert_eq!(SubtaskBand::for_score(3.9).max_subtasks, 3);
        assert_eq!(SubtaskBand::for_score(4.0).min_subtasks, 3);
        assert_eq!(SubtaskBand::for_score(6.99).max_subtasks, 5);
        assert_eq!(SubtaskBand::for_score(7.0).min_subtasks, 5);
        assert_eq!(SubtaskBand::for_score(9.0).min_subtasks, 7);
        assert_eq!(SubtaskBand::for_score(10.0).max_subtasks, 10);
    }

    #[test]
    fn test_fractional_score_lands_in_lower_band() {
        let band = SubtaskBand::for_score(7.85);
        assert_eq!((band.min_subtasks, band.max_subtasks), (5, 7));
    }

    #[test]
    fn test_out_of_range_scores_clamp() {
        assert_eq!(SubtaskBand::for_score(0.0), &SUBTASK_BANDS[0]);
        assert_eq!(SubtaskBand::for_score(42.0), &SUBTASK_BANDS[3]);
        assert_eq!(SubtaskBand::for_score(f64::NAN), &SUBTASK_BANDS[0]);
    }

    #[test]
    fn test_merge_with_self_is_noop() {
        let original = report(vec![entry(1, 3.0), entry(2, 6.0), entry(3, 9.0)]);
        let merged = ComplexityReport::merge_entries(
            &original.complexity_analysis,
            original.complexity_analysis.clone(),
        );
        assert_eq!(merged, original.complexity_analysis);
    }

    #[test]
    fn test_merge_overwrites_same_id() {
        let prior = report(vec![entry(1, 3.0), entry(3, 4.0)]);
        let replacement = entry(3, 8.5);
        let merged = ComplexityReport::merged(Some(&prior), vec![replacement.clone()], run());

        let threes: Vec<_> = merged
            .complexity_analysis
            .iter()
            .filter(|e| e.task_id == 3)
            .collect();
        assert_eq!(threes.len(), 1);
        assert_eq!(threes[0], &replacement);
        assert_eq!(merged.meta.analysis_count, 2);
    }

    #[test]
    fn test_merge_disjoint_batches_commute_as_sets() {
        let a = vec![entry(1, 2.0), entry(2, 5.0)];
        let b = vec![entry(3, 7.0)];

        let ab = ComplexityReport::merge_entries(&ComplexityReport::merge_entries(&[], a.clone()), b.clone());
        let ba = ComplexityReport::merge_entries(&ComplexityReport::merge_entries(&[], b), a);

        let mut ab_ids: Vec<_> = ab.iter().map(|e| e.task_id).collect();
        let mut ba_ids: Vec<_> = ba.iter().map(|e| e.task_id).collect();
        ab_ids.sort_unstable();
        ba_ids.sort_unstable();
        assert_eq!(ab_ids, ba_ids);
    }

    #[test]
    fn test_merge_never_shrinks() {
        let prior = vec![entry(1, 2.0), entry(2, 5.0), entry(3, 7.0)];
        let merged = ComplexityReport::merge_entries(&prior, vec![entry(2, 9.0)]);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.iter().map(|e| e.task_id).collect::<Vec<_>>(), vec![1, 3, 2]);
    }

    #[test]
    fn test_merge_dedups_fresh_batch() {
        let merged = ComplexityReport::merge_entries(&[], vec![entry(4, 2.0), entry(4, 6.0)]);
        assert_eq!(merged.len(), 1);
        assert!((merged[0].complexity_score - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_tasks_needing_expansion_sorted() {
        let report = report(vec![entry(1, 5.0), entry(2, 2.0), entry(3, 9.5)]);
        let ids: Vec<_> = report
            .tasks_needing_expansion()
            .iter()
            .map(|e| e.task_id)
            .collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn test_summary_counts() {
        let report = report(vec![entry(1, 2.0), entry(2, 5.0), entry(3, 7.9), entry(4, 8.0)]);
        assert_eq!(
            report.summary(),
            ReportSummary {
                low: 1,
                medium: 2,
                high: 1
            }
        );
    }

    #[test]
    fn test_report_wire_format() {
        let report = report(vec![entry(1, 4.5)]);
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["meta"]["generatedAt"].is_string());
        assert_eq!(json["meta"]["analysisCount"], 1);
        assert_eq!(json["meta"]["thresholdScore"], 5.0);
        assert_eq!(json["meta"]["usedResearch"], false);
        assert_eq!(json["complexityAnalysis"][0]["taskId"], 1);
        assert_eq!(json["complexityAnalysis"][0]["recommendedSubtasks"], 4);
    }

    #[test]
    fn test_legacy_report_without_counts_loads() {
        let report: ComplexityReport = serde_json::from_str(
            r#"{"meta": {"generatedAt": "2025-01-02T03:04:05Z", "thresholdScore": 6},
                "complexityAnalysis": []}"#,
        )
        .unwrap();
        assert_eq!(report.meta.analysis_count, 0);
        assert!(report.meta.project_name.is_empty());
    }

    #[test]
    fn test_fallback_entry() {
        let fallback = ComplexityAnalysisEntry::fallback(9, "Cache layer");
        assert!((fallback.complexity_score - 5.0).abs() < f64::EPSILON);
        assert_eq!(fallback.recommended_subtasks, 3);
        assert!(fallback.expansion_prompt.contains("Cache layer"));
        assert!(fallback.reasoning.starts_with("Auto-generated"));
    }
}
