//! Provider Registry - Manages AI provider instances.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::ModelSettings;
use crate::errors::{TasksError, TasksResult};

#[cfg(feature = "ai")]
use super::anthropic::AnthropicProvider;
use super::provider::AIProvider;

/// Registry of AI providers keyed by name.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn AIProvider>>,
}

impl ProviderRegistry {
    /// Create an empty provider registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in providers registered.
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "ai")]
        registry.register(Arc::new(AnthropicProvider::from_env()));

        registry
    }

    /// Register a provider, replacing any provider with the same name.
    pub fn register(&mut self, provider: Arc<dyn AIProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    /// Get a provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn AIProvider>> {
        self.providers.get(name).cloned()
    }

    pub fn has_provider(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Get all registered provider names, sorted.
    pub fn provider_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolve the provider for a model configuration.
    ///
    /// Fails when the provider is unknown or has no credentials, or when a
    /// `baseURL` is configured for a provider with a fixed endpoint.
    pub fn require_for(&self, settings: &ModelSettings) -> TasksResult<Arc<dyn AIProvider>> {
        let provider = self
            .get(&settings.provider)
            .ok_or_else(|| TasksError::ProviderNotConfigured {
                provider: settings.provider.clone(),
            })?;

        if !provider.is_configured() {
            return Err(TasksError::ProviderNotConfigured {
                provider: format!(
                    "{} (set {})",
                    settings.provider,
                    provider.api_key_env_var()
                ),
            });
        }

        let provider = match settings.base_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => {
                tracing::debug!(
                    provider = provider.name(),
                    base_url = url,
                    "Using configured endpoint"
                );
                provider
                    .with_endpoint(url)
                    .ok_or_else(|| TasksError::ConfigError {
                        reason: format!(
                            "provider '{}' does not accept a custom baseURL",
                            settings.provider
                        ),
                    })?
            }
            _ => provider,
        };

        if !provider.supports_model(&settings.model_id) {
            tracing::warn!(
                provider = provider.name(),
                model = %settings.model_id,
                "Model is not in the provider's known list; sending it anyway"
            );
        }

        Ok(provider)
    }
}
