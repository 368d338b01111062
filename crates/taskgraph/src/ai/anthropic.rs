//! Anthropic Claude AI provider implementation.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::errors::{GenerationErrorKind, TasksError, TasksResult};

use super::provider::{AIMessage, AIProvider, AIResponse, AIRole, GenerateOptions, TokenUsage};

/// Anthropic API endpoint
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Anthropic API version
const ANTHROPIC_VERSION: &str = "2023-06-01";

const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

const SUPPORTED_MODELS: &[&str] = &[
    "claude-opus-4-5-20251101",
    "claude-sonnet-4-5-20250929",
    // Short names for convenience
    "opus",
    "sonnet",
    "haiku",
    "claude-opus-4-1-20250805",
    "claude-sonnet-4-20250514",
    "claude-3-5-haiku-20241022",
    "claude-3-opus-20240229",
    "claude-3-haiku-20240307",
];

/// Map short names to the canonical API model name.
fn normalize_model(model: &str) -> &str {
    match model {
        "opus" => "claude-opus-4-5-20251101",
        "sonnet" => "claude-sonnet-4-5-20250929",
        "haiku" => "claude-3-5-haiku-20241022",
        _ => model,
    }
}

/// Classify an unsuccessful HTTP status.
fn classify_status(status: StatusCode) -> GenerationErrorKind {
    match status.as_u16() {
        401 | 403 => GenerationErrorKind::Auth,
        429 => GenerationErrorKind::RateLimit,
        400 | 404 | 413 | 422 => GenerationErrorKind::Validation,
        _ => GenerationErrorKind::Network,
    }
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    model: String,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorResponse {
    error: AnthropicError,
}

/// Turn an error body into a generation error, preferring the API's own
/// error type over the HTTP status where the two disagree.
fn error_from_body(status: StatusCode, body: &str) -> TasksError {
    match serde_json::from_str::<AnthropicErrorResponse>(body) {
        Ok(parsed) => {
            let kind = match parsed.error.error_type.as_str() {
                "authentication_error" | "permission_error" => GenerationErrorKind::Auth,
                "rate_limit_error" => GenerationErrorKind::RateLimit,
                "invalid_request_error" | "not_found_error" | "request_too_large" => {
                    GenerationErrorKind::Validation
                }
                _ => classify_status(status),
            };
            TasksError::generation(
                kind,
                format!(
                    "Anthropic API error: {} - {}",
                    parsed.error.error_type, parsed.error.message
                ),
            )
        }
        Err(_) => TasksError::generation(
            classify_status(status),
            format!("Anthropic API error ({status}): {body}"),
        ),
    }
}

/// Anthropic Claude provider.
pub struct AnthropicProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider with an API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: Some(api_key.into()),
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    /// Create from the `ANTHROPIC_API_KEY` environment variable.
    ///
    /// A missing key still yields a provider; it reports itself as not
    /// configured and fails generation with an auth error.
    pub fn from_env() -> Self {
        Self {
            client: Client::new(),
            api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Messages endpoint requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert messages to Anthropic format, extracting system message.
    fn convert_messages(messages: &[AIMessage]) -> (Option<String>, Vec<AnthropicMessage>) {
        let mut system: Option<String> = None;
        let mut converted = Vec::new();

        for msg in messages {
            match msg.role {
                // Anthropic uses a separate system field
                AIRole::System => match system.as_mut() {
                    Some(existing) => {
                        existing.push_str("\n\n");
                        existing.push_str(&msg.content);
                    }
                    None => system = Some(msg.content.clone()),
                },
                AIRole::User => converted.push(AnthropicMessage {
                    role: "user".to_string(),
                    content: msg.content.clone(),
                }),
                AIRole::Assistant => converted.push(AnthropicMessage {
                    role: "assistant".to_string(),
                    content: msg.content.clone(),
                }),
            }
        }

        (system, converted)
    }
}

#[async_trait]
impl AIProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn api_key_env_var(&self) -> &'static str {
        "ANTHROPIC_API_KEY"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn supported_models(&self) -> Vec<&str> {
        SUPPORTED_MODELS.to_vec()
    }

    fn with_endpoint(&self, base_url: &str) -> Option<Arc<dyn AIProvider>> {
        let provider = Self {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
        }
        .with_base_url(base_url);
        Some(Arc::new(provider))
    }

    async fn generate_text(
        &self,
        model: &str,
        messages: &[AIMessage],
        options: &GenerateOptions,
    ) -> TasksResult<AIResponse> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            TasksError::generation(GenerationErrorKind::Auth, "ANTHROPIC_API_KEY not set")
        })?;

        let normalized_model = normalize_model(model);
        let (system, converted_messages) = Self::convert_messages(messages);

        let request = AnthropicRequest {
            model: normalized_model.to_string(),
            messages: converted_messages,
            max_tokens: options.max_tokens.unwrap_or(4096),
            system,
            temperature: options.temperature,
            stop_sequences: options.stop_sequences.clone(),
        };

        tracing::info!(model = normalized_model, "Calling Claude API");

        let response = self
            .client
            .post(&self.base_url)
            .timeout(options.effective_timeout())
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                TasksError::generation(
                    GenerationErrorKind::Network,
                    format!("Anthropic API request failed: {e}"),
                )
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            TasksError::generation(
                GenerationErrorKind::Network,
                format!("Failed to read response: {e}"),
            )
        })?;

        if !status.is_success() {
            return Err(error_from_body(status, &body));
        }

        let parsed: AnthropicResponse = serde_json::from_str(&body).map_err(|e| {
            TasksError::generation(
                GenerationErrorKind::Parse,
                format!("Unexpected Anthropic response body: {e}"),
            )
        })?;

        let text: String = parsed
            .content
            .iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text.as_str())
            .collect();

        tracing::debug!(
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            chars = text.len(),
            "Claude API call complete"
        );

        Ok(AIResponse {
            text,
            usage: TokenUsage::new(parsed.usage.input_tokens, parsed.usage.output_tokens),
            model: parsed.model,
            provider: "anthropic".to_string(),
        })
    }
}

impl Default for AnthropicProvider {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Get the default Anthropic model.
pub fn default_model() -> &'static str {
    DEFAULT_MODEL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_name() {
        let provider = AnthropicProvider::new("sk-test");
        assert_eq!(provider.name(), "anthropic");
        assert!(provider.is_configured());
    }

    #[test]
    fn test_supported_models() {
        let provider = AnthropicProvider::new("sk-test");
        assert!(provider.supports_model(default_model()));
        assert!(provider.supports_model("haiku"));
        assert!(!provider.supports_model("gpt-4"));
        assert_eq!(normalize_model("sonnet"), "claude-sonnet-4-5-20250929");
    }

    #[test]
    fn test_message_conversion() {
        let messages = vec![
            AIMessage::system("You are a helpful assistant"),
            AIMessage::user("Hello"),
            AIMessage::assistant("Hi there!"),
            AIMessage::system("Answer in JSON"),
            AIMessage::user("How are you?"),
        ];

        let (system, converted) = AnthropicProvider::convert_messages(&messages);

        assert_eq!(
            system.as_deref(),
            Some("You are a helpful assistant\n\nAnswer in JSON")
        );
        assert_eq!(converted.len(), 3);
        assert_eq!(converted[0].role, "user");
        assert_eq!(converted[1].role, "assistant");
        assert_eq!(converted[2].role, "user");
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED),
            GenerationErrorKind::Auth
        );
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            GenerationErrorKind::RateLimit
        );
        assert_eq!(
            classify_status(StatusCode::BAD_REQUEST),
            GenerationErrorKind::Validation
        );
        assert_eq!(
            classify_status(StatusCode::BAD_GATEWAY),
            GenerationErrorKind::Network
        );
    }

    #[test]
    fn test_error_body_type_wins_over_status() {
        let body = r#"{"type":"error","error":{"type":"rate_limit_error","message":"slow down"}}"#;
        let err = error_from_body(StatusCode::SERVICE_UNAVAILABLE, body);
        assert_eq!(err.generation_kind(), Some(GenerationErrorKind::RateLimit));
        assert!(err.to_string().contains("slow down"));

        let err = error_from_body(StatusCode::FORBIDDEN, "<html>denied</html>");
        assert_eq!(err.generation_kind(), Some(GenerationErrorKind::Auth));
    }

    #[test]
    fn test_custom_endpoint() {
        let provider = AnthropicProvider::new("sk-test");
        assert_eq!(provider.base_url(), ANTHROPIC_API_URL);

        let proxied = provider.with_base_url("http://localhost:8080/v1/messages");
        assert_eq!(proxied.base_url(), "http://localhost:8080/v1/messages");

        let retargeted = proxied.with_endpoint("http://proxy.internal/v1/messages");
        assert!(retargeted.is_some_and(|p| p.is_configured()));
    }

    #[tokio::test]
    async fn test_missing_key_is_auth_error() {
        let provider = AnthropicProvider {
            client: Client::new(),
            api_key: None,
            base_url: ANTHROPIC_API_URL.to_string(),
        };
        let err = provider
            .generate_text(DEFAULT_MODEL, &[AIMessage::user("hi")], &GenerateOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.generation_kind(), Some(GenerationErrorKind::Auth));
    }
}
