//! Domain facades for task graph operations.
//!
//! These facades combine storage operations with the analysis logic.

mod complexity;
mod config;
pub mod deps;
mod selector;

pub use complexity::{
    AnalysisContext, AnalysisOutcome, AnalysisRun, AnalysisStage, AnalyzeOptions,
    ComplexityDomain,
};
pub use config::ConfigDomain;
pub use deps::{
    detect_cycles, has_dependency, would_create_cycle, Cycle, DanglingDependency,
    DependencyDomain, DependencyReport,
};
pub use selector::{select_tasks, Selection, TaskSelection};
