#![warn(clippy::pedantic)]
// Allow common pedantic lints that don't affect correctness
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_self)]
#![allow(clippy::map_unwrap_or)]

//! # Taskgraph
//!
//! Dependency-graph validation and AI-assisted complexity analysis for
//! task collections stored in `.tasks/`.
//!
//! This crate provides:
//! - Hierarchical task identifiers (`5`, `5.3`, `5.3.1`)
//! - Cycle and dangling-reference detection over task dependencies
//! - A complexity analysis pipeline that prompts a model, repairs its
//!   answer and merges the result into a persistent report
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use taskgraph::{AnalyzeOptions, ComplexityDomain, FileStorage, TasksConfig};
//!
//! let storage = FileStorage::new(".");
//! let options = AnalyzeOptions::new(storage.tasks_file(), storage.report_file());
//! let domain = ComplexityDomain::new(Arc::new(storage), TasksConfig::default());
//!
//! let run = domain.analyze(&options).await?;
//! println!("{} entries", run.outcome.report().complexity_analysis.len());
//! ```

// Core entities
pub mod entities;

// Error types
pub mod errors;

// Storage layer
pub mod storage;

// Domain facades
pub mod domain;

// Terminal UI helpers
pub mod ui;

// AI integration
pub mod ai;

// Re-export key types for convenience
pub use domain::{
    AnalysisOutcome, AnalysisRun, AnalysisStage, AnalyzeOptions, ComplexityDomain, ConfigDomain,
    DependencyDomain, DependencyReport, TaskSelection,
};
pub use entities::{
    parse_identifier, GlobalConfig, IdentifierInfo, ModelConfig, ModelRole, ModelSettings,
    Subtask, Task, TaskIdentifier, TaskPriority, TaskStatus, TasksConfig,
};
pub use errors::{GenerationErrorKind, TasksError, TasksResult};
pub use storage::{FileStorage, ReportLock, Storage};

// Re-export AI types
pub use ai::{
    AIMessage, AIProvider, AIResponse, AIRole, ComplexityAnalysisEntry, ComplexityReport,
    GenerateOptions, PromptManager, PromptMode, PromptTemplate, ProviderRegistry, TokenUsage,
};
