//! Tools the travel agent can call
//!
//! Tools are stateless singletons; everything a call needs arrives in its
//! `ToolContext`.

mod travel_planner;

pub use travel_planner::TravelPlannerTool;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::llm::{LlmService, ToolDefinition};

/// Result from tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub output: String,
}

impl ToolOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: message.into(),
        }
    }
}

/// All context needed for a tool invocation.
///
/// Created fresh for each tool call.
#[derive(Clone)]
pub struct ToolContext {
    /// Cancellation signal for long-running operations
    pub cancel: CancellationToken,

    /// The conversation (agent thread) this tool is executing within
    pub conversation_id: String,

    llm: Arc<dyn LlmService>,
}

impl ToolContext {
    pub fn new(
        cancel: CancellationToken,
        conversation_id: impl Into<String>,
        llm: Arc<dyn LlmService>,
    ) -> Self {
        Self {
            cancel,
            conversation_id: conversation_id.into(),
            llm,
        }
    }

    /// Model for tools that consult the LLM themselves
    pub fn llm(&self) -> &Arc<dyn LlmService> {
        &self.llm
    }
}

/// Trait for tools that can be executed by the agent
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name
    fn name(&self) -> &str;

    /// Tool description for LLM
    fn description(&self) -> String;

    /// JSON schema for tool input
    fn input_schema(&self) -> Value;

    /// Execute the tool.
    ///
    /// Failures are reported through `ToolOutput::error` so the model can
    /// see them and recover.
    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput;
}

/// Collection of tools offered to the agent
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// The travel agent's tool set
    pub fn standard() -> Self {
        Self::new(vec![Arc::new(TravelPlannerTool)])
    }

    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self { tools }
    }

    /// Get all tool definitions for LLM
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Execute a tool by name; `None` if no such tool exists
    pub async fn execute(&self, name: &str, input: Value, ctx: ToolContext) -> Option<ToolOutput> {
        let tool = self.tools.iter().find(|t| t.name() == name)?;
        Some(tool.run(input, ctx).await)
    }
}
