//! Session errors

use super::turn::{TransitionError, TurnFailure};
use crate::agent::AgentUnavailable;
use crate::conversation::StoreError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Conversation not found")]
    NotFound(String),
    #[error("Failed to get response from agent: {0}")]
    AgentUnavailable(String),
    #[error("Conversation history conflict: {0}")]
    ProtocolViolation(String),
    #[error("Agent did not respond in time")]
    TimedOut,
    #[error("Turn cancelled")]
    Cancelled,
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => SessionError::NotFound(id),
            StoreError::ProtocolViolation(detail) => SessionError::ProtocolViolation(detail),
        }
    }
}

impl From<AgentUnavailable> for SessionError {
    fn from(err: AgentUnavailable) -> Self {
        SessionError::AgentUnavailable(err.message)
    }
}

impl From<TurnFailure> for SessionError {
    fn from(failure: TurnFailure) -> Self {
        match failure {
            TurnFailure::AgentUnavailable(message) => SessionError::AgentUnavailable(message),
            TurnFailure::TimedOut => SessionError::TimedOut,
            TurnFailure::Cancelled => SessionError::Cancelled,
        }
    }
}
