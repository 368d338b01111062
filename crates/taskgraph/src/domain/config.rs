//! Configuration domain facade.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::entities::{ModelRole, ModelSettings, TasksConfig};
use crate::errors::{TasksError, TasksResult};

/// Configuration domain facade
pub struct ConfigDomain {
    config_path: PathBuf,
}

impl ConfigDomain {
    /// Create a config domain for the project at `project_path`.
    pub fn new(project_path: impl AsRef<Path>) -> Self {
        Self {
            config_path: project_path.as_ref().join(".tasks").join("config.json"),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load configuration; a missing file yields the defaults.
    pub async fn load(&self) -> TasksResult<TasksConfig> {
        match fs::read_to_string(&self.config_path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| TasksError::ConfigError {
                reason: format!("{}: {e}", self.config_path.display()),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TasksConfig::default()),
            Err(e) => Err(TasksError::FileReadError {
                path: self.config_path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Save configuration
    pub async fn save(&self, config: &TasksConfig) -> TasksResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.config_path, content)
            .await
            .map_err(|e| TasksError::FileWriteError {
                path: self.config_path.display().to_string(),
                reason: e.to_string(),
            })
    }

    /// Model settings for a role, after fallbacks.
    pub async fn model_for(&self, role: ModelRole) -> TasksResult<ModelSettings> {
        Ok(self.load().await?.models.for_role(role))
    }

    /// Set the model for a role
    pub async fn set_model(&self, role: ModelRole, settings: ModelSettings) -> TasksResult<()> {
        let mut config = self.load().await?;
        match role {
            ModelRole::Main => config.models.main = Some(settings),
            ModelRole::Research => config.models.research = Some(settings),
        }
        self.save(&config).await
    }
}
