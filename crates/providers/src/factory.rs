//! Provider construction from configuration.

use std::sync::Arc;
use toolloop_config::AppConfig;
use toolloop_core::error::ProviderError;
use toolloop_core::provider::Provider;
use tracing::debug;

use crate::openai_compat::OpenAiCompatProvider;

/// Build the configured provider.
///
/// `base_url` in the config overrides the provider's well-known URL.
/// Every provider except `ollama` needs an API key.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let name = config.provider.as_str();
    let base_url = match &config.base_url {
        Some(url) => url.clone(),
        None => default_base_url(name).ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "Unknown provider '{name}': set base_url to use a custom endpoint"
            ))
        })?,
    };

    let api_key = match (&config.api_key, name) {
        (Some(key), _) => key.clone(),
        (None, "ollama") => "ollama".to_string(),
        (None, _) => {
            return Err(ProviderError::NotConfigured(format!(
                "No API key for provider '{name}'. Set TOOLLOOP_API_KEY or api_key in config.toml"
            )));
        }
    };

    debug!(provider = %name, base_url = %base_url, "Building provider");
    Ok(Arc::new(OpenAiCompatProvider::new(name, base_url, api_key)?))
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> Option<String> {
    let url = match provider_name {
        "openai" => "https://api.openai.com/v1",
        "openrouter" => "https://openrouter.ai/api/v1",
        "ollama" => "http://localhost:11434/v1",
        _ => return None,
    };
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openrouter").unwrap().contains("openrouter.ai"));
        assert!(default_base_url("openai").unwrap().contains("api.openai.com"));
        assert!(default_base_url("ollama").unwrap().contains("localhost:11434"));
        assert!(default_base_url("mystery").is_none());
    }

    #[test]
    fn builds_openai_with_key() {
        let config = AppConfig {
            api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn missing_key_is_not_configured() {
        let err = build_from_config(&AppConfig::default()).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn ollama_needs_no_key() {
        let config = AppConfig {
            provider: "ollama".into(),
            ..AppConfig::default()
        };
        assert_eq!(build_from_config(&config).unwrap().name(), "ollama");
    }

    #[test]
    fn custom_provider_requires_base_url() {
        let mut config = AppConfig {
            provider: "vllm".into(),
            api_key: Some("k".into()),
            ..AppConfig::default()
        };
        assert!(build_from_config(&config).is_err());

        config.base_url = Some("http://localhost:8000/v1".into());
        assert_eq!(build_from_config(&config).unwrap().name(), "vllm");
    }
}
