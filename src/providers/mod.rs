//! Provider module for Confab
//!
//! This module contains the assistant gateway abstraction and the
//! OpenAI-compatible implementation.

pub mod base;
pub mod openai;

pub use base::{CompletionResponse, ImageData, Provider, TokenUsage};
pub use openai::OpenAiProvider;

use crate::config::ProviderConfig;
use crate::error::Result;

/// Create a provider instance based on configuration
///
/// # Arguments
///
/// * `config` - Provider configuration
/// * `model_override` - Optional chat model replacing `config.model`
///
/// # Errors
///
/// Returns error if credentials are missing or initialization fails
pub fn create_provider(
    config: &ProviderConfig,
    model_override: Option<&str>,
) -> Result<Box<dyn Provider>> {
    let mut config = config.clone();
    if let Some(model) = model_override {
        tracing::debug!("Using model override: {}", model);
        config.model = model.to_string();
    }
    Ok(Box::new(OpenAiProvider::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_provider_without_key_fails() {
        let result = create_provider(&ProviderConfig::default(), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_create_provider_with_model_override() {
        let config = ProviderConfig {
            api_key: Some("sk-test".to_string()),
            ..ProviderConfig::default()
        };
        let provider = create_provider(&config, Some("gpt-4o")).unwrap();
        assert_eq!(provider.model(), "gpt-4o");
    }

    #[test]
    fn test_create_provider_default_model() {
        let config = ProviderConfig {
            api_key: Some("sk-test".to_string()),
            ..ProviderConfig::default()
        };
        let provider = create_provider(&config, None).unwrap();
        assert_eq!(provider.model(), "gpt-4o-mini");
    }
}
