//! Agent capability and the adapter the session layer talks to
//!
//! An agent receives the full replayed history of a conversation and
//! produces a sequence of history snapshots; the last snapshot is the final
//! history including the agent's reply.

mod adapter;
mod error;
mod react;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{AgentAdapter, SnapshotStream};
pub use error::{AgentError, AgentUnavailable};
pub use react::{ReactAgent, DEFAULT_MAX_STEPS};

use crate::conversation::Message;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;

/// Snapshots of the conversation history as the agent works
pub type HistoryStream = BoxStream<'static, Result<Vec<Message>, AgentError>>;

/// A turn-based agent that may stream its progress
#[async_trait]
pub trait Agent: Send + Sync {
    /// Run one turn over `history`, yielding the full history after every
    /// step. The stream is lazy and finite.
    ///
    /// `thread_id` identifies the conversation for logging; the history is
    /// authoritative.
    fn stream(&self, thread_id: &str, history: Vec<Message>) -> HistoryStream;

    /// Run one turn and return only the final history.
    ///
    /// An empty result means the agent produced no snapshot at all.
    async fn invoke(&self, thread_id: &str, history: Vec<Message>) -> Result<Vec<Message>, AgentError> {
        let mut snapshots = self.stream(thread_id, history);
        let mut last = Vec::new();
        while let Some(snapshot) = snapshots.next().await {
            last = snapshot?;
        }
        Ok(last)
    }
}
