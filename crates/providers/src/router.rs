//! Provider router — builds the configured completion clients and hands
//! out the default one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use docchat_config::AppConfig;
use docchat_core::error::CompletionError;
use docchat_core::provider::CompletionClient;
use tracing::debug;

use crate::gemini::{self, GeminiProvider};
use crate::openai_compat::OpenAiCompatProvider;

/// Routes completion requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn CompletionClient>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn CompletionClient>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default_client(&self) -> Result<Arc<dyn CompletionClient>, CompletionError> {
        self.get(&self.default_provider).ok_or_else(|| {
            CompletionError::NotConfigured(format!(
                "provider '{}' is not configured",
                self.default_provider
            ))
        })
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn CompletionClient>> {
        self.providers.get(name).cloned()
    }

    pub fn default_provider(&self) -> &str {
        &self.default_provider
    }

    /// List all registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Build providers from configuration.
///
/// The default provider is always built, even without a `[providers]` entry.
/// A hosted provider with no API key anywhere is a `NotConfigured` error.
pub fn build_from_config(config: &AppConfig) -> Result<ProviderRouter, CompletionError> {
    let mut router = ProviderRouter::new(&config.default_provider);
    let timeout = Duration::from_secs(config.request_timeout_secs);

    let mut names: Vec<&str> = config.providers.keys().map(|s| s.as_str()).collect();
    if !config.providers.contains_key(&config.default_provider) {
        names.push(&config.default_provider);
    }

    for name in names {
        let base_url = config
            .providers
            .get(name)
            .and_then(|p| p.api_url.clone())
            .unwrap_or_else(|| default_base_url(name));

        let api_key = match config.api_key_for(name) {
            Some(key) => key,
            None if is_local(name) => String::new(),
            None if name == config.default_provider => {
                return Err(CompletionError::NotConfigured(format!(
                    "no API key for provider '{name}'; set GOOGLE_API_KEY or api_key in {}",
                    AppConfig::config_path().display()
                )));
            }
            None => {
                debug!(provider = %name, "Skipping provider without API key");
                continue;
            }
        };

        let provider: Arc<dyn CompletionClient> = if name == "gemini" {
            Arc::new(GeminiProvider::with_options(base_url, api_key, timeout)?)
        } else {
            Arc::new(OpenAiCompatProvider::with_timeout(
                name, base_url, api_key, timeout,
            )?)
        };

        router.register(name, provider);
    }

    Ok(router)
}

/// Providers that run on the local machine and need no key.
fn is_local(provider_name: &str) -> bool {
    matches!(provider_name, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "gemini" => gemini::DEFAULT_BASE_URL.into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docchat_config::ProviderConfig;

    fn config_with_key() -> AppConfig {
        AppConfig {
            api_key: Some("test-key".into()),
            ..AppConfig::default()
        }
    }

    #[test]
    fn router_register_and_lookup() {
        let mut router = ProviderRouter::new("openai");
        let provider = Arc::new(OpenAiCompatProvider::openai("sk-test").unwrap());
        router.register("openai", provider);

        assert!(router.get("openai").is_some());
        assert!(router.get("nonexistent").is_none());
        assert!(router.default_client().is_ok());
    }

    #[test]
    fn missing_default_is_not_configured() {
        let router = ProviderRouter::new("gemini");
        assert!(matches!(
            router.default_client(),
            Err(CompletionError::NotConfigured(_))
        ));
    }

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("gemini").contains("generativelanguage.googleapis.com"));
        assert!(default_base_url("openai").contains("api.openai.com"));
        assert!(default_base_url("ollama").contains("localhost:11434"));
    }

    #[test]
    fn build_from_default_config_with_key() {
        let router = build_from_config(&config_with_key()).unwrap();
        let client = router.default_client().unwrap();
        assert_eq!(client.name(), "gemini");
    }

    #[test]
    fn build_without_key_fails_for_hosted_default() {
        let config = AppConfig::default();
        assert!(matches!(
            build_from_config(&config),
            Err(CompletionError::NotConfigured(_))
        ));
    }

    #[test]
    fn local_provider_needs_no_key() {
        let config = AppConfig {
            default_provider: "ollama".into(),
            ..AppConfig::default()
        };
        let router = build_from_config(&config).unwrap();
        assert_eq!(router.default_client().unwrap().name(), "ollama");
    }

    #[test]
    fn configured_providers_are_registered() {
        let mut config = config_with_key();
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("sk-test".into()),
                api_url: None,
                default_model: Some("gpt-4o-mini".into()),
            },
        );
        let router = build_from_config(&config).unwrap();
        assert_eq!(router.list(), vec!["gemini", "openai"]);
        assert_eq!(router.default_provider(), "gemini");
    }
}
