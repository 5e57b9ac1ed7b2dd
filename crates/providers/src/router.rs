//! Provider router: selects the correct LLM provider based on config.

use std::collections::HashMap;
use std::sync::Arc;
use steward_core::provider::Provider;
use steward_config::AppConfig;
use crate::openai_compat::{GEMINI_BASE_URL, OpenAiCompatProvider};

/// Named providers plus the one the agent talks to by default.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider, replacing any earlier one with the same name.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.get(&self.default_provider)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Build the router from configuration.
///
/// Every backend speaks the OpenAI chat-completions dialect. The default
/// provider is registered even without a `[providers.<name>]` section,
/// using the top-level key and its well-known base URL.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    for (name, section) in &config.providers {
        let api_key = section.api_key.as_ref().or(config.api_key.as_ref());
        let base_url = section.api_url.clone().unwrap_or_else(|| default_base_url(name));
        router.register(name.clone(), compat(name, &base_url, api_key));
    }

    if router.get(&config.default_provider).is_none() {
        let name = &config.default_provider;
        let base_url = default_base_url(name);
        router.register(name.clone(), compat(name, &base_url, config.api_key.as_ref()));
    }

    tracing::debug!(
        default = %config.default_provider,
        providers = router.len(),
        "Provider router built"
    );

    router
}

fn compat(name: &str, base_url: &str, api_key: Option<&String>) -> Arc<dyn Provider> {
    let key = api_key.map(String::as_str).unwrap_or_default();
    Arc::new(OpenAiCompatProvider::new(name, base_url, key))
}

/// The model to use for the default provider: its own `default_model`
/// if configured, otherwise the top-level one.
pub fn resolve_model(config: &AppConfig) -> String {
    config
        .providers
        .get(&config.default_provider)
        .and_then(|p| p.default_model.clone())
        .unwrap_or_else(|| config.default_model.clone())
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "gemini" | "google" => GEMINI_BASE_URL.into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
