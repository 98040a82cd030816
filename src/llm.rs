//! LLM provider abstraction
//!
//! Provides a common interface over `OpenAI`-compatible chat completion
//! providers, with streaming support.

mod error;
mod models;
mod openai;
mod registry;
mod types;

pub use error::{LlmError, LlmErrorKind};
pub use models::{all_models, find_model, ModelDef, Provider, DEFAULT_MODEL_ID};
pub use openai::OpenAICompatService;
pub use registry::{LlmConfig, ModelRegistry};
pub use types::*;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::Arc;

/// Events of a streamed completion, in arrival order
pub type LlmEventStream = BoxStream<'static, Result<StreamEvent, LlmError>>;

/// Common interface for LLM providers
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Make a completion request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Make a streaming completion request.
    ///
    /// Providers without native streaming get the whole response as a
    /// single burst of events.
    async fn complete_stream(&self, request: &LlmRequest) -> Result<LlmEventStream, LlmError> {
        let response = self.complete(request).await?;
        Ok(futures::stream::iter(response_events(response).into_iter().map(Ok)).boxed())
    }

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// The events a streaming provider would have produced for `response`
pub fn response_events(response: LlmResponse) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    for block in response.content {
        match block {
            ContentBlock::Text { text } if !text.is_empty() => {
                events.push(StreamEvent::TextDelta(text));
            }
            ContentBlock::ToolUse { id, name, input } => {
                events.push(StreamEvent::ToolUse(ToolUse { id, name, input }));
            }
            _ => {}
        }
    }
    events.push(StreamEvent::Done {
        end_turn: response.end_turn,
        usage: response.usage,
    });
    events
}

/// Logging wrapper for LLM services
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "LLM request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "LLM request failed"
                );
            }
        }

        result
    }

    async fn complete_stream(&self, request: &LlmRequest) -> Result<LlmEventStream, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete_stream(request).await;

        match result {
            Ok(stream) => {
                tracing::debug!(
                    model = %self.model_id,
                    connect_ms = %start.elapsed().as_millis(),
                    "LLM stream opened"
                );
                let model_id = self.model_id.clone();
                Ok(stream
                    .inspect(move |event| match event {
                        Ok(StreamEvent::Done { usage, .. }) => {
                            tracing::info!(
                                model = %model_id,
                                duration_ms = %start.elapsed().as_millis(),
                                input_tokens = usage.input_tokens,
                                output_tokens = usage.output_tokens,
                                "LLM stream completed"
                            );
                        }
                        Err(e) => {
                            tracing::error!(
                                model = %model_id,
                                error = %e.message,
                                "LLM stream failed"
                            );
                        }
                        Ok(_) => {}
                    })
                    .boxed())
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %start.elapsed().as_millis(),
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "LLM stream request failed"
                );
                Err(e)
            }
        }
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
