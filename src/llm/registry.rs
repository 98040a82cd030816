//! Model registry for managing available LLM providers

use super::{all_models, LlmService, LoggingService, ModelDef, OpenAICompatService, Provider};
use super::DEFAULT_MODEL_ID;
use std::collections::HashMap;
use std::sync::Arc;

/// Configuration for LLM providers
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub groq_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    /// OpenAI-compatible endpoint override (local server, proxy)
    pub base_url: Option<String>,
    /// Default model ID
    pub default_model: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            groq_api_key: non_empty_var("GROQ_API_KEY"),
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            base_url: non_empty_var("LLM_BASE_URL"),
            default_model: non_empty_var("DEFAULT_MODEL"),
        }
    }

    fn api_key(&self, provider: Provider) -> Option<&String> {
        match provider {
            Provider::Groq => self.groq_api_key.as_ref(),
            Provider::OpenAI => self.openai_api_key.as_ref(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Registry of available LLM models
pub struct ModelRegistry {
    services: HashMap<String, Arc<dyn LlmService>>,
    default_model: String,
}

impl ModelRegistry {
    /// Create an empty registry for testing purposes
    #[cfg(test)]
    pub fn new_empty() -> Self {
        Self {
            services: HashMap::new(),
            default_model: "test-model".to_string(),
        }
    }

    pub fn new(config: &LlmConfig) -> Self {
        let mut services: HashMap<String, Arc<dyn LlmService>> = HashMap::new();

        for model_def in all_models() {
            if let Some(service) = Self::try_create_model(model_def, config) {
                services.insert(model_def.id.to_string(), service);
            }
        }

        let default_model = config
            .default_model
            .clone()
            .or_else(|| {
                if services.contains_key(DEFAULT_MODEL_ID) {
                    Some(DEFAULT_MODEL_ID.to_string())
                } else {
                    // Fall back to the first available model, in definition order
                    all_models()
                        .iter()
                        .find(|m| services.contains_key(m.id))
                        .map(|m| m.id.to_string())
                }
            })
            .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string());

        Self {
            services,
            default_model,
        }
    }

    /// Try to create a model service, validating prerequisites
    fn try_create_model(model_def: &ModelDef, config: &LlmConfig) -> Option<Arc<dyn LlmService>> {
        // An endpoint override may not need a key at all (local servers)
        let api_key = match (config.api_key(model_def.provider), &config.base_url) {
            (Some(key), _) => key.clone(),
            (None, Some(_)) => "implicit".to_string(),
            (None, None) => {
                tracing::debug!(
                    model = model_def.id,
                    env = model_def.provider.api_key_env_var(),
                    "Skipping model without API key"
                );
                return None;
            }
        };

        match OpenAICompatService::new(api_key, model_def, config.base_url.as_deref()) {
            Ok(service) => Some(Arc::new(LoggingService::new(Arc::new(service)))),
            Err(e) => {
                tracing::warn!(model = model_def.id, error = %e, "Failed to create model service");
                None
            }
        }
    }

    /// Get a model by ID
    pub fn get(&self, model_id: &str) -> Option<Arc<dyn LlmService>> {
        self.services.get(model_id).cloned()
    }

    /// Get the default model
    pub fn default(&self) -> Option<Arc<dyn LlmService>> {
        self.get(&self.default_model)
    }

    /// Get the default model ID
    pub fn default_model_id(&self) -> &str {
        &self.default_model
    }

    /// List all available model IDs
    pub fn available_models(&self) -> Vec<String> {
        let mut models: Vec<_> = self.services.keys().cloned().collect();
        models.sort();
        models
    }

    /// Check if any models are available
    pub fn has_models(&self) -> bool {
        !self.services.is_empty()
    }
}
