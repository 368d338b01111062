//! AI Provider trait and common types.
//!
//! Defines the interface that all AI providers must implement.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::TasksResult;

/// Default ceiling on a single generation call.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(300);

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AIRole {
    /// System message (sets context/behavior)
    System,
    /// User message (input)
    User,
    /// Assistant message (AI response)
    Assistant,
}

/// A message in a conversation with an AI model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AIMessage {
    pub role: AIRole,
    pub content: String,
}

impl AIMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: AIRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: AIRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: AIRole::Assistant,
            content: content.into(),
        }
    }
}

/// Token usage information from an AI response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    /// Total tokens (input + output)
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens.saturating_add(output_tokens),
        }
    }
}

/// Successful result of a generation call.
///
/// Failures are reported as [`crate::errors::TasksError::Generation`] with a
/// [`crate::errors::GenerationErrorKind`], never as a response with an error
/// field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AIResponse {
    /// Generated text content
    pub text: String,
    pub usage: TokenUsage,
    /// Model that generated the response
    pub model: String,
    /// Provider that generated the response
    pub provider: String,
}

/// Options for text generation.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Temperature for sampling (0.0 to 1.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    pub stop_sequences: Option<Vec<String>>,
    /// Per-call timeout; [`DEFAULT_GENERATION_TIMEOUT`] when unset
    pub timeout: Option<Duration>,
}

impl GenerateOptions {
    pub fn effective_timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_GENERATION_TIMEOUT)
    }
}

/// Trait for AI providers.
///
/// Implementations classify every failure with a
/// [`crate::errors::GenerationErrorKind`] at the point it happens.
#[async_trait]
pub trait AIProvider: Send + Sync {
    /// Get the provider name (e.g., "anthropic").
    fn name(&self) -> &'static str;

    /// Get the environment variable name for the API key.
    fn api_key_env_var(&self) -> &'static str;

    /// Check if the provider is configured (has API key).
    fn is_configured(&self) -> bool;

    /// Get the list of supported models.
    fn supported_models(&self) -> Vec<&str>;

    /// Check if a model is supported.
    fn supports_model(&self, model: &str) -> bool {
        self.supported_models().contains(&model)
    }

    /// A copy of this provider that posts to `base_url` instead of its
    /// default endpoint. `None` when the endpoint is fixed.
    fn with_endpoint(&self, _base_url: &str) -> Option<Arc<dyn AIProvider>> {
        None
    }

    /// Generate text from messages.
    async fn generate_text(
        &self,
        model: &str,
        messages: &[AIMessage],
        options: &GenerateOptions,
    ) -> TasksResult<AIResponse>;
}

/// Builder for constructing AI messages.
#[derive(Debug, Default)]
pub struct MessageBuilder {
    messages: Vec<AIMessage>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn system(mut self, content: impl Into<String>) -> Self {
        self.messages.push(AIMessage::system(content));
        self
    }

    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(AIMessage::user(content));
        self
    }

    pub fn assistant(mut self, content: impl Into<String>) -> Self {
        self.messages.push(AIMessage::assistant(content));
        self
    }

    /// Build the message list.
    pub fn build(self) -> Vec<AIMessage> {
        self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_builder_order() {
        let messages = MessageBuilder::new()
            .system("rules")
            .user("question")
            .assistant("answer")
            .build();

        let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![AIRole::System, AIRole::User, AIRole::Assistant]);
        assert_eq!(messages[1].content, "question");
    }

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage::new(1200, 340);
        assert_eq!(usage.total_tokens, 1540);
        assert_eq!(TokenUsage::new(u32::MAX, 1).total_tokens, u32::MAX);
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(
            GenerateOptions::default().effective_timeout(),
            Duration::from_secs(300)
        );
        let options = GenerateOptions {
            timeout: Some(Duration::from_secs(5)),
            ..GenerateOptions::default()
        };
        assert_eq!(options.effective_timeout(), Duration::from_secs(5));
    }
}
