//! Analyze complexity prompt templates.
//!
//! Scores tasks against a weighted rubric and recommends how many subtasks
//! each should be expanded into. The three tiers trade prompt size for
//! guidance; the rubric, the band table and the output contract are the
//! same in all of them, so the response parser never needs to know which
//! tier produced a response.

use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};

use super::{PromptManager, PromptTemplate};
use crate::ai::schemas::SUBTASK_BANDS;
use crate::entities::Task;
use crate::errors::TasksResult;

/// Compression tier for the complexity prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptMode {
    /// Full rubric descriptions and the complete task records
    #[default]
    Standard,
    /// Short rubric descriptions and trimmed task records
    Balanced,
    /// Rubric weights only and minimal task records
    Advanced,
}

impl PromptMode {
    pub const ALL: [Self; 3] = [Self::Standard, Self::Balanced, Self::Advanced];

    /// Parse a mode name, falling back to [`PromptMode::Standard`] on
    /// anything unrecognised.
    pub fn parse_or_default(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "standard" => Self::Standard,
            "balanced" => Self::Balanced,
            "advanced" => Self::Advanced,
            other => {
                if !other.is_empty() {
                    tracing::warn!(mode = other, "Unknown prompt mode; using standard");
                }
                Self::default()
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Balanced => "balanced",
            Self::Advanced => "advanced",
        }
    }

    pub(crate) fn template_id(self) -> &'static str {
        match self {
            Self::Standard => "analyze-complexity-standard",
            Self::Balanced => "analyze-complexity-balanced",
            Self::Advanced => "analyze-complexity-advanced",
        }
    }

    /// Project a task into the record embedded for this tier.
    fn task_record(self, task: &Task) -> Value {
        match self {
            Self::Standard => json!({
                "id": task.id,
                "title": task.title,
                "description": task.description,
                "details": task.details,
                "testStrategy": task.test_strategy,
                "status": task.status.to_string(),
                "priority": task.priority.to_string(),
                "dependencies": task.dependencies,
                "subtasks": task.subtasks.iter().map(|s| json!({
                    "id": s.id,
                    "title": s.title,
                })).collect::<Vec<_>>(),
            }),
            Self::Balanced => json!({
                "id": task.id,
                "title": task.title,
                "description": task.description,
                "details": task.details,
                "dependencies": task.dependencies,
            }),
            Self::Advanced => json!({
                "id": task.id,
                "title": task.title,
                "description": task.description,
                "dependencies": task.dependencies,
            }),
        }
    }
}

impl fmt::Display for PromptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One weighted dimension of the scoring rubric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RubricDimension {
    pub name: &'static str,
    /// Weight in percent
    pub weight: u8,
    pub description: &'static str,
    /// Condensed description for the balanced tier
    pub summary: &'static str,
}

/// The scoring rubric. Weights sum to 100.
pub const RUBRIC: [RubricDimension; 5] = [
    RubricDimension {
        name: "Technical",
        weight: 25,
        description: "Algorithmic difficulty, new technology, amount of code touched and the \
                      depth of the changes",
        summary: "algorithms, new tech, code volume",
    },
    RubricDimension {
        name: "Integration",
        weight: 20,
        description: "Number of systems, services and modules the task must coordinate with, \
                      including external APIs and data migrations",
        summary: "systems and APIs touched",
    },
    RubricDimension {
        name: "Domain",
        weight: 20,
        description: "Business rules and specialist knowledge needed to get the behaviour right",
        summary: "business rules, specialist knowledge",
    },
    RubricDimension {
        name: "Risk",
        weight: 20,
        description: "Unknowns, security or data-loss exposure, and how hard failures are to \
                      detect or roll back",
        summary: "unknowns, security, rollback",
    },
    RubricDimension {
        name: "Maintenance",
        weight: 15,
        description: "Testing burden, documentation and the long-term cost of keeping the \
                      result working",
        summary: "tests, docs, upkeep",
    },
];

/// Band row as rendered into the prompt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct BandRow {
    min_score: u8,
    max_score: u8,
    min_subtasks: u32,
    max_subtasks: u32,
}

/// Caller-controlled prompt inputs.
#[derive(Debug, Clone)]
pub struct PromptOptions {
    pub mode: PromptMode,
    /// Expansion threshold shown to the model
    pub threshold: f64,
    pub use_research: bool,
    /// Free-form project context appended to the user prompt
    pub project_context: String,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            mode: PromptMode::default(),
            threshold: 5.0,
            use_research: false,
            project_context: String::new(),
        }
    }
}

/// Context for the analyze-complexity templates.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeComplexityContext {
    /// Tasks to analyze (as JSON)
    pub tasks: Value,
    pub task_count: usize,
    pub rubric: Vec<RubricDimension>,
    bands: Vec<BandRow>,
    pub threshold: f64,
    pub use_research: bool,
    /// Additional project context
    pub gathered_context: String,
}

impl AnalyzeComplexityContext {
    pub fn new(tasks: &[Task], options: &PromptOptions) -> Self {
        Self {
            tasks: Value::Array(tasks.iter().map(|t| options.mode.task_record(t)).collect()),
            task_count: tasks.len(),
            rubric: RUBRIC.to_vec(),
            bands: SUBTASK_BANDS
                .iter()
                .map(|b| BandRow {
                    min_score: b.min_score,
                    max_score: b.max_score,
                    min_subtasks: b.min_subtasks,
                    max_subtasks: b.max_subtasks,
                })
                .collect(),
            threshold: options.threshold,
            use_research: options.use_research,
            gathered_context: options.project_context.trim().to_string(),
        }
    }
}

/// A rendered prompt ready for generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPrompt {
    pub system: String,
    pub user: String,
    pub mode: PromptMode,
}

impl PromptManager {
    /// Render the complexity prompt for `tasks` in the requested tier.
    pub fn compile_complexity_prompt(
        &self,
        tasks: &[Task],
        options: &PromptOptions,
    ) -> TasksResult<CompiledPrompt> {
        let context = AnalyzeComplexityContext::new(tasks, options);
        let (system, user) = self.render(options.mode.template_id(), &context)?;
        Ok(CompiledPrompt {
            system,
            user,
            mode: options.mode,
        })
    }
}

/// Get the analyze-complexity template for a tier.
pub(super) fn template(mode: PromptMode) -> PromptTemplate {
    let (intro, rubric, user, description) = match mode {
        PromptMode::Standard => (
            STANDARD_INTRO,
            STANDARD_RUBRIC,
            STANDARD_USER,
            "Analyze task complexity with full rubric guidance",
        ),
        PromptMode::Balanced => (
            BALANCED_INTRO,
            BALANCED_RUBRIC,
            BALANCED_USER,
            "Analyze task complexity with condensed guidance",
        ),
        PromptMode::Advanced => (
            ADVANCED_INTRO,
            ADVANCED_RUBRIC,
            ADVANCED_USER,
            "Analyze task complexity with minimal guidance",
        ),
    };

    let system = format!("{intro}\n\n{rubric}\n\n{BAND_TABLE}\n\n{OUTPUT_CONTRACT}");
    PromptTemplate::new(mode.template_id(), system, user).with_description(description)
}

const STANDARD_INTRO: &str = "You are an expert software architect and project manager analyzing \
task complexity. Your analysis should consider implementation effort, technical challenges, \
dependencies, and testing requirements. Score every task independently, then recommend how many \
subtasks it should be broken into so that each subtask is a focused, reviewable unit of work.";

const BALANCED_INTRO: &str = "You are a software architect scoring task complexity and \
recommending subtask counts.";

const ADVANCED_INTRO: &str = "Score task complexity and recommend subtask counts.";

const STANDARD_RUBRIC: &str = "Score each task from 1 to 10 as the weighted sum of these \
dimensions, each rated 1 to 10:
{{#each rubric}}
- {{name}} ({{weight}}%): {{description}}
{{/each}}";

const BALANCED_RUBRIC: &str = "Rubric (weighted, 1-10 each):
{{#each rubric}}
- {{name}} {{weight}}%: {{summary}}
{{/each}}";

const ADVANCED_RUBRIC: &str = "Rubric:{{#each rubric}} {{name}} {{weight}}%{{#unless @last}},{{/unless}}{{/each}}";

const BAND_TABLE: &str = "recommendedSubtasks must fall inside the band for the score:
{{#each bands}}
- score {{minScore}}-{{maxScore}}: {{minSubtasks}}-{{maxSubtasks}} subtasks
{{/each}}";

const OUTPUT_CONTRACT: &str = r#"Respond with ONLY a JSON array containing one object per task, each with exactly these fields:
- "taskId": the task's integer id
- "taskTitle": the task's title
- "complexityScore": a number from 1 to 10 (decimals allowed)
- "recommendedSubtasks": an integer inside the band for the score
- "reasoning": a short justification that references the rubric
- "expansionPrompt": an instruction for breaking the task into subtasks
Do not wrap the array in an object. Do not add commentary or markdown fences."#;

const STANDARD_USER: &str = r"Analyze the following {{task_count}} tasks. Provide a complexity score, a recommended subtask count, a brief reasoning and an initial expansion prompt for each. Tasks scoring {{threshold}} or higher will be expanded, so make their expansion prompts specific.{{#if use_research}} Consider current best practices, common implementation patterns, and industry standards in your analysis.{{/if}}

Tasks:
{{{json tasks}}}
{{#if gathered_context}}

# Project Context

{{gathered_context}}
{{/if}}";

const BALANCED_USER: &str = r"Analyze these {{task_count}} tasks (expansion threshold {{threshold}}).{{#if use_research}} Apply current industry practice.{{/if}}

Tasks:
{{{compact_json tasks}}}
{{#if gathered_context}}

Context: {{gathered_context}}
{{/if}}";

const ADVANCED_USER: &str = r"Tasks ({{task_count}}, threshold {{threshold}}){{#if use_research}}, research mode{{/if}}:
{{{compact_json tasks}}}{{#if gathered_context}}
Context: {{gathered_context}}{{/if}}";
