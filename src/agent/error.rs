//! Agent errors

use crate::llm::LlmError;
use thiserror::Error;

/// Failure inside an agent run
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),
    #[error("Agent did not finish within {0} steps")]
    StepLimit(usize),
    #[error("Agent stream failed: {0}")]
    Stream(String),
}

/// The agent could not produce a result for this turn
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Agent unavailable: {message}")]
pub struct AgentUnavailable {
    pub message: String,
}

impl AgentUnavailable {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<AgentError> for AgentUnavailable {
    fn from(err: AgentError) -> Self {
        Self::new(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_error_becomes_unavailable() {
        let err: AgentUnavailable = AgentError::StepLimit(8).into();
        assert_eq!(err.message, "Agent did not finish within 8 steps");

        let err: AgentUnavailable = AgentError::from(LlmError::auth("bad key")).into();
        assert_eq!(err.to_string(), "Agent unavailable: LLM request failed: bad key");
    }
}
