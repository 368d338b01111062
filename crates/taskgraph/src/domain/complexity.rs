//! Complexity analysis domain.
//!
//! One run walks a fixed sequence of [`AnalysisStage`]s: load the tasks,
//! select the active subset, read any prior report, prompt the model, repair
//! and reconcile its answer, merge with the prior report and persist. The
//! report file is locked for the whole read-merge-write span.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;
use uuid::Uuid;

use super::selector::{select_tasks, Selection, TaskSelection};
use crate::ai::{
    parse_complexity_response, reconcile, ComplexityAnalysisEntry, ComplexityReport,
    GenerateOptions, MessageBuilder, PromptManager, PromptMode, PromptOptions, ProviderRegistry,
    RunSummary, TokenUsage, DEFAULT_GENERATION_TIMEOUT,
};
use crate::entities::{ModelRole, TasksConfig};
use crate::errors::{GenerationErrorKind, TasksError, TasksResult};
use crate::storage::Storage;

/// Steps of an analysis run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStage {
    LoadInput,
    Filter,
    ShortCircuitEmpty,
    LoadExistingReport,
    CompilePrompt,
    Generate,
    Parse,
    Reconcile,
    Merge,
    Persist,
    Done,
    DoneNoChange,
    Failed,
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LoadInput => "load-input",
            Self::Filter => "filter",
            Self::ShortCircuitEmpty => "short-circuit-empty",
            Self::LoadExistingReport => "load-existing-report",
            Self::CompilePrompt => "compile-prompt",
            Self::Generate => "generate",
            Self::Parse => "parse",
            Self::Reconcile => "reconcile",
            Self::Merge => "merge",
            Self::Persist => "persist",
            Self::Done => "done",
            Self::DoneNoChange => "done-no-change",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Inputs for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub tasks_path: PathBuf,
    pub report_path: PathBuf,
    pub selection: TaskSelection,
    /// Expansion threshold; the configured default when unset
    pub threshold: Option<f64>,
    pub use_research: bool,
    /// Prompt tier; the configured tier when unset
    pub prompt_mode: Option<PromptMode>,
    /// Model id overriding the configured one
    pub model: Option<String>,
    /// Project name recorded in the report; the configured name when unset
    pub project_name: Option<String>,
    pub project_context: String,
    /// Generation timeout; the configured timeout when unset
    pub timeout: Option<Duration>,
}

impl AnalyzeOptions {
    pub fn new(tasks_path: impl Into<PathBuf>, report_path: impl Into<PathBuf>) -> Self {
        Self {
            tasks_path: tasks_path.into(),
            report_path: report_path.into(),
            selection: TaskSelection::All,
            threshold: None,
            use_research: false,
            prompt_mode: None,
            model: None,
            project_name: None,
            project_context: String::new(),
            timeout: None,
        }
    }

    pub fn with_selection(mut self, selection: TaskSelection) -> Self {
        self.selection = selection;
        self
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// A report was written
    Updated(ComplexityReport),
    /// Nothing to analyze; the existing report is returned as it was
    Unchanged(ComplexityReport),
}

impl AnalysisOutcome {
    pub fn report(&self) -> &ComplexityReport {
        match self {
            Self::Updated(report) | Self::Unchanged(report) => report,
        }
    }

    pub fn into_report(self) -> ComplexityReport {
        match self {
            Self::Updated(report) | Self::Unchanged(report) => report,
        }
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated(_))
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub run_id: Uuid,
    pub outcome: AnalysisOutcome,
    /// Token usage of the generation call, if one was made
    pub usage: Option<TokenUsage>,
    /// Requested ids that were absent or inactive
    pub missing_ids: Vec<u32>,
    /// Ids the model skipped that received default entries
    pub synthesized_ids: Vec<u32>,
    /// Ids whose previous analysis was replaced
    pub reanalyzed_ids: Vec<u32>,
}

/// State shared by the stages of one run, fixed once the prior report is read.
pub struct AnalysisContext {
    run_id: Uuid,
    selection: Selection,
    prior: Option<ComplexityReport>,
    existing: HashMap<u32, ComplexityAnalysisEntry>,
}

impl AnalysisContext {
    fn new(run_id: Uuid, selection: Selection, prior: Option<ComplexityReport>) -> Self {
        let existing = prior
            .as_ref()
            .map(|r| {
                r.complexity_analysis
                    .iter()
                    .map(|e| (e.task_id, e.clone()))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            run_id,
            selection,
            prior,
            existing,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn prior(&self) -> Option<&ComplexityReport> {
        self.prior.as_ref()
    }

    /// The previous analysis of a task, if the prior report had one.
    pub fn previous_analysis(&self, task_id: u32) -> Option<&ComplexityAnalysisEntry> {
        self.existing.get(&task_id)
    }

    /// Selected ids that already have an analysis.
    pub fn reanalyzed_ids(&self) -> Vec<u32> {
        self.selection
            .tasks
            .iter()
            .map(|t| t.id)
            .filter(|id| self.existing.contains_key(id))
            .collect()
    }
}

fn enter(stage: AnalysisStage) {
    tracing::debug!(%stage, "Analysis stage");
}

/// Complexity analysis domain facade
pub struct ComplexityDomain {
    storage: Arc<dyn Storage>,
    registry: ProviderRegistry,
    prompts: PromptManager,
    config: TasksConfig,
}

impl ComplexityDomain {
    /// Create a domain with the built-in providers.
    pub fn new(storage: Arc<dyn Storage>, config: TasksConfig) -> Self {
        Self::with_registry(storage, ProviderRegistry::with_defaults(), config)
    }

    /// Create with a custom provider registry.
    pub fn with_registry(
        storage: Arc<dyn Storage>,
        registry: ProviderRegistry,
        config: TasksConfig,
    ) -> Self {
        Self {
            storage,
            registry,
            prompts: PromptManager::default(),
            config,
        }
    }

    /// Analyze task complexity and update the report.
    pub async fn analyze(&self, options: &AnalyzeOptions) -> TasksResult<AnalysisRun> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("analyze_complexity", %run_id);

        async {
            let result = self.run_stages(run_id, options).await;
            match &result {
                Ok(run) => {
                    let report = run.outcome.report();
                    tracing::info!(
                        updated = run.outcome.is_updated(),
                        entries = report.complexity_analysis.len(),
                        synthesized = run.synthesized_ids.len(),
                        "Complexity analysis finished"
                    );
                }
                Err(e) => {
                    enter(AnalysisStage::Failed);
                    tracing::debug!(error = %e, "Complexity analysis failed");
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_stages(&self, run_id: Uuid, options: &AnalyzeOptions) -> TasksResult<AnalysisRun> {
        enter(AnalysisStage::LoadInput);
        let tasks = self.storage.load_tasks(&options.tasks_path).await?;

        enter(AnalysisStage::Filter);
        let selection = select_tasks(&tasks, &options.selection);

        if selection.is_empty() {
            enter(AnalysisStage::ShortCircuitEmpty);
            return self.short_circuit(run_id, options, selection).await;
        }

        // Held from before the prior report is read until the merged one is written
        let _lock = self.storage.lock_report(&options.report_path).await?;

        enter(AnalysisStage::LoadExistingReport);
        let prior = self.load_prior(options).await;
        let context = AnalysisContext::new(run_id, selection, prior);

        enter(AnalysisStage::CompilePrompt);
        let prompt_options = PromptOptions {
            mode: options.prompt_mode.unwrap_or_else(|| {
                PromptMode::parse_or_default(&self.config.global.prompt_mode)
            }),
            threshold: self.threshold(options),
            use_research: options.use_research,
            project_context: options.project_context.clone(),
        };
        let prompt = self
            .prompts
            .compile_complexity_prompt(&context.selection().tasks, &prompt_options)?;

        enter(AnalysisStage::Generate);
        let role = if options.use_research {
            ModelRole::Research
        } else {
            ModelRole::Main
        };
        let mut settings = self.config.models.for_role(role);
        if let Some(model) = &options.model {
            settings.model_id.clone_from(model);
        }
        let provider = self.registry.require_for(&settings)?;

        let timeout = options.timeout.unwrap_or_else(|| self.configured_timeout());
        let generate_options = GenerateOptions {
            temperature: Some(settings.temperature),
            max_tokens: Some(settings.max_tokens),
            stop_sequences: None,
            timeout: Some(timeout),
        };
        let messages = MessageBuilder::new()
            .system(prompt.system)
            .user(prompt.user)
            .build();

        tracing::debug!(
            provider = provider.name(),
            model = %settings.model_id,
            %role,
            mode = %prompt.mode,
            tasks = context.selection().tasks.len(),
            "Requesting complexity analysis"
        );

        let response = tokio::time::timeout(
            timeout,
            provider.generate_text(&settings.model_id, &messages, &generate_options),
        )
        .await
        .map_err(|_| {
            TasksError::generation(
                GenerationErrorKind::Network,
                format!("generation timed out after {}s", timeout.as_secs()),
            )
        })??;

        enter(AnalysisStage::Parse);
        let parsed = parse_complexity_response(&response.text)?;

        enter(AnalysisStage::Reconcile);
        let reconciled = reconcile(&context.selection().tasks, parsed);

        enter(AnalysisStage::Merge);
        let run = self.run_summary(options, context.selection());
        let report = ComplexityReport::merged(context.prior(), reconciled.entries, run);

        enter(AnalysisStage::Persist);
        self.storage
            .save_report(&options.report_path, &report)
            .await?;

        enter(AnalysisStage::Done);
        Ok(AnalysisRun {
            run_id: context.run_id(),
            reanalyzed_ids: context.reanalyzed_ids(),
            missing_ids: context.selection.missing_ids,
            outcome: AnalysisOutcome::Updated(report),
            usage: Some(response.usage),
            synthesized_ids: reconciled.synthesized,
        })
    }

    /// Nothing is selected: keep an existing report untouched, or write an
    /// empty one so later commands find a valid file. Only the write takes
    /// the report lock.
    async fn short_circuit(
        &self,
        run_id: Uuid,
        options: &AnalyzeOptions,
        selection: Selection,
    ) -> TasksResult<AnalysisRun> {
        let prior = self.load_prior(options).await;

        let outcome = if let Some(prior) = prior {
            tracing::info!("No active tasks matched; keeping the existing report");
            enter(AnalysisStage::DoneNoChange);
            AnalysisOutcome::Unchanged(prior)
        } else {
            tracing::info!("No active tasks matched; writing an empty report");
            let _lock = self.storage.lock_report(&options.report_path).await?;
            let report = ComplexityReport::new(self.run_summary(options, &selection), Vec::new());
            enter(AnalysisStage::Persist);
            self.storage
                .save_report(&options.report_path, &report)
                .await?;
            enter(AnalysisStage::Done);
            AnalysisOutcome::Updated(report)
        };

        Ok(AnalysisRun {
            run_id,
            outcome,
            usage: None,
            missing_ids: selection.missing_ids,
            synthesized_ids: Vec::new(),
            reanalyzed_ids: Vec::new(),
        })
    }

    /// Read the prior report. An unreadable report counts as absent.
    async fn load_prior(&self, options: &AnalyzeOptions) -> Option<ComplexityReport> {
        match self.storage.load_report(&options.report_path).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(
                    path = %options.report_path.display(),
                    error = %e,
                    "Existing complexity report could not be read; starting fresh"
                );
                None
            }
        }
    }

    fn threshold(&self, options: &AnalyzeOptions) -> f64 {
        options
            .threshold
            .unwrap_or(self.config.global.default_threshold)
    }

    fn configured_timeout(&self) -> Duration {
        match self.config.global.request_timeout_secs {
            0 => DEFAULT_GENERATION_TIMEOUT,
            secs => Duration::from_secs(secs),
        }
    }

    fn run_summary(&self, options: &AnalyzeOptions, selection: &Selection) -> RunSummary {
        RunSummary {
            tasks_analyzed: selection.tasks.len(),
            total_tasks: selection.original_count,
            threshold_score: self.threshold(options),
            project_name: options
                .project_name
                .clone()
                .or_else(|| self.config.global.project_name.clone())
                .unwrap_or_default(),
            used_research: options.use_research,
        }
    }
}
