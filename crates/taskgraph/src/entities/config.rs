//! Configuration entities.

use serde::{Deserialize, Serialize};

use crate::errors::TasksError;

/// Main configuration structure (`.tasks/config.json`)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TasksConfig {
    /// AI model configurations
    #[serde(default)]
    pub models: ModelConfig,

    /// Global settings
    #[serde(default)]
    pub global: GlobalConfig,
}

/// Which configured model a generation call runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelRole {
    #[default]
    Main,
    Research,
}

impl std::fmt::Display for ModelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Main => write!(f, "main"),
            Self::Research => write!(f, "research"),
        }
    }
}

/// Model configuration for AI providers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Main model for analysis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<ModelSettings>,

    /// Research model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research: Option<ModelSettings>,
}

impl ModelConfig {
    /// Settings for a role. Research falls back to main, main to the defaults.
    pub fn for_role(&self, role: ModelRole) -> ModelSettings {
        let configured = match role {
            ModelRole::Main => self.main.as_ref(),
            ModelRole::Research => self.research.as_ref().or(self.main.as_ref()),
        };
        configured.cloned().unwrap_or_default()
    }
}

/// Individual model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Provider name (e.g., "anthropic")
    pub provider: String,

    /// Model ID
    #[serde(rename = "modelId")]
    pub model_id: String,

    /// Maximum tokens
    #[serde(default = "default_max_tokens", rename = "maxTokens")]
    pub max_tokens: u32,

    /// Temperature (0.0 - 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Endpoint override, e.g. a proxy's messages URL
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "baseURL")]
    pub base_url: Option<String>,
}

const fn default_max_tokens() -> u32 {
    8000
}

const fn default_temperature() -> f32 {
    0.2
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model_id: "claude-sonnet-4-20250514".to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            base_url: None,
        }
    }
}

impl std::str::FromStr for ModelSettings {
    type Err = TasksError;

    /// Parse `provider:model_id`, keeping default sampling settings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((provider, model_id))
                if !provider.trim().is_empty() && !model_id.trim().is_empty() =>
            {
                Ok(Self {
                    provider: provider.trim().to_string(),
                    model_id: model_id.trim().to_string(),
                    ..Self::default()
                })
            }
            _ => Err(TasksError::InvalidArgument {
                reason: format!("model '{s}' must be in the form 'provider:model_id'"),
            }),
        }
    }
}

/// Global configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Log level used when RUST_LOG is unset
    #[serde(default = "default_log_level", rename = "logLevel")]
    pub log_level: String,

    /// Project name recorded in complexity reports
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "projectName"
    )]
    pub project_name: Option<String>,

    /// Score at or above which a task is recommended for expansion
    #[serde(default = "default_threshold", rename = "defaultThreshold")]
    pub default_threshold: f64,

    /// Prompt compression tier (standard, balanced, advanced)
    #[serde(default = "default_prompt_mode", rename = "promptMode")]
    pub prompt_mode: String,

    /// Seconds to wait for a single generation call
    #[serde(default = "default_timeout_secs", rename = "requestTimeoutSecs")]
    pub request_timeout_secs: u64,
}

fn default_log_level() -> String {
    "warn".to_string()
}

const fn default_threshold() -> f64 {
    5.0
}

fn default_prompt_mode() -> String {
    "standard".to_string()
}

const fn default_timeout_secs() -> u64 {
    300
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            project_name: None,
            default_threshold: default_threshold(),
            prompt_mode: default_prompt_mode(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}
