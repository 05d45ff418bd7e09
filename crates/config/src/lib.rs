//! Configuration loading and validation for ToolLoop.
//!
//! Loads configuration from `~/.toolloop/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use toolloop_core::agent::LoopConfig;
use toolloop_core::model::SupportedModel;

/// The root configuration structure.
///
/// Maps directly to `~/.toolloop/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Provider name: "openai", "openrouter" or "ollama"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Override the provider's base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Model id, one of the supported models
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per model response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Agent loop settings
    #[serde(default)]
    pub agent: LoopConfig,

    /// Context augmentation settings
    #[serde(default)]
    pub context: ContextConfig,

    /// Retrieval-driven tool selection
    #[serde(default)]
    pub tool_retrieval: ToolRetrievalConfig,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    SupportedModel::default().to_string()
}
fn default_temperature() -> f32 {
    toolloop_core::provider::default_temperature()
}
fn default_top_k() -> usize {
    2
}
fn default_separator() -> String {
    "\n".into()
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("agent", &self.agent)
            .field("context", &self.context)
            .field("tool_retrieval", &self.tool_retrieval)
            .finish()
    }
}

/// `[context]`: documents used to augment each message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Directory of `.txt`/`.md` files; no augmentation when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents_dir: Option<PathBuf>,

    /// Fragments retrieved per message
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Joins fragments into the context block
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Custom prompt template with `{context_str}` and `{query_str}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            documents_dir: None,
            top_k: default_top_k(),
            separator: default_separator(),
            template: None,
        }
    }
}

/// `[tool_retrieval]`: choose tools per message from their descriptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRetrievalConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Tools offered per message
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for ToolRetrievalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            top_k: default_top_k(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.toolloop/config.toml).
    ///
    /// Environment variables take priority over the file:
    /// - `TOOLLOOP_API_KEY`, then `OPENAI_API_KEY`, then `OPENROUTER_API_KEY`
    ///   (only when the file sets no key)
    /// - `TOOLLOOP_PROVIDER`
    /// - `TOOLLOOP_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("TOOLLOOP_API_KEY")
                .or_else(|| lookup("OPENAI_API_KEY"))
                .or_else(|| lookup("OPENROUTER_API_KEY"));
        }

        if let Some(provider) = lookup("TOOLLOOP_PROVIDER") {
            self.provider = provider;
        }

        if let Some(model) = lookup("TOOLLOOP_MODEL") {
            self.model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".toolloop")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_tool_calls == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_tool_calls must be > 0".into(),
            ));
        }

        if self.context.top_k == 0 || self.tool_retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError("top_k must be > 0".into()));
        }

        if self.context.documents_dir.is_some() && self.tool_retrieval.enabled {
            return Err(ConfigError::ValidationError(
                "tool_retrieval cannot be combined with context.documents_dir".into(),
            ));
        }

        self.supported_model()?;
        Ok(())
    }

    /// The configured model, checked against the allow-list.
    pub fn supported_model(&self) -> Result<SupportedModel, ConfigError> {
        self.model
            .parse()
            .map_err(|e: toolloop_core::Error| ConfigError::ValidationError(e.to_string()))
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `config` command).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            base_url: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
            agent: LoopConfig::default(),
            context: ContextConfig::default(),
            tool_retrieval: ToolRetrievalConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for toolloop_core::Error {
    fn from(err: ConfigError) -> Self {
        toolloop_core::Error::config(err.to_string())
    }
}
