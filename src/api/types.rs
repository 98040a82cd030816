//! API request and response types

use crate::conversation::Message;
use crate::session::TurnOutcome;
use serde::{Deserialize, Serialize};

/// Request to send a chat message.
///
/// A missing or empty `conversation_id` starts a new conversation.
#[derive(Debug, Deserialize)]
pub struct ConversationRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Result of a chat turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationResponse {
    pub conversation_id: String,
    pub response: String,
    pub messages: Vec<Message>,
}

impl From<TurnOutcome> for ConversationResponse {
    fn from(outcome: TurnOutcome) -> Self {
        Self {
            conversation_id: outcome.conversation_id,
            response: outcome.response,
            messages: outcome.messages,
        }
    }
}

/// Response for a deleted conversation
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub status: &'static str,
    pub message: &'static str,
}

impl DeleteResponse {
    pub fn deleted() -> Self {
        Self {
            status: "success",
            message: "Conversation deleted",
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
