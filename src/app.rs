//! Wiring shared by the server and the CLI

use crate::agent::{AgentAdapter, ReactAgent};
use crate::config::SessionConfig;
use crate::conversation::ConversationStore;
use crate::llm::{LlmConfig, LlmError, LlmRequest, LlmResponse, LlmService, ModelRegistry};
use crate::session::SessionCoordinator;
use crate::tools::ToolRegistry;
use async_trait::async_trait;
use std::sync::Arc;

/// Build the session coordinator over the configured default model.
///
/// Without a usable model the coordinator still starts; every turn then
/// fails with an agent error naming the missing configuration.
pub fn build_session(llm_config: &LlmConfig, session_config: SessionConfig) -> SessionCoordinator {
    let registry = ModelRegistry::new(llm_config);

    let llm: Arc<dyn LlmService> = if let Some(llm) = registry.default() {
        tracing::info!(
            models = ?registry.available_models(),
            default = %registry.default_model_id(),
            "LLM registry initialized"
        );
        llm
    } else {
        tracing::warn!(
            model = %registry.default_model_id(),
            available = ?registry.available_models(),
            "No usable LLM configured. Set GROQ_API_KEY, OPENAI_API_KEY or LLM_BASE_URL."
        );
        Arc::new(UnconfiguredService {
            model_id: registry.default_model_id().to_string(),
        })
    };

    let agent = ReactAgent::new(llm, ToolRegistry::standard(), session_config.max_steps);
    SessionCoordinator::new(
        Arc::new(ConversationStore::new()),
        AgentAdapter::new(Arc::new(agent)),
        session_config,
    )
}

/// Stand-in model that rejects every request
struct UnconfiguredService {
    model_id: String,
}

#[async_trait]
impl LlmService for UnconfiguredService {
    async fn complete(&self, _request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        Err(LlmError::auth(format!(
            "model {} is not configured (missing API key)",
            self.model_id
        )))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
