//! AI integration.
//!
//! - Provider abstraction with structured failure kinds
//! - Anthropic Claude provider (behind the `ai` feature)
//! - Complexity prompt templates
//! - Response parsing and report schemas

#[cfg(feature = "ai")]
pub mod anthropic;
pub mod prompts;
pub mod provider;
pub mod registry;
pub mod response;
pub mod schemas;

#[cfg(feature = "ai")]
pub use anthropic::AnthropicProvider;
pub use prompts::{CompiledPrompt, PromptManager, PromptMode, PromptOptions, PromptTemplate};
pub use provider::{
    AIMessage, AIProvider, AIResponse, AIRole, GenerateOptions, MessageBuilder, TokenUsage,
    DEFAULT_GENERATION_TIMEOUT,
};
pub use registry::ProviderRegistry;
pub use response::{extract_json_payload, parse_complexity_response, reconcile, Reconciled};
pub use schemas::{
    ComplexityAnalysisEntry, ComplexityLevel, ComplexityReport, ReportMeta, ReportSummary,
    RunSummary, SubtaskBand, SUBTASK_BANDS,
};
