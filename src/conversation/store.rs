//! In-memory conversation store
//!
//! Histories live for the lifetime of the process. Each conversation carries
//! its own turn lock so that turns on one id run one at a time while turns on
//! different ids never wait on each other.

use super::Message;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Conversation not found: {0}")]
    NotFound(String),
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Default)]
struct Slot {
    history: Mutex<Vec<Message>>,
    turn_lock: Arc<Mutex<()>>,
}

/// Exclusive right to run a turn on one conversation.
///
/// Released on drop.
pub struct TurnGuard {
    _guard: OwnedMutexGuard<()>,
}

/// Mapping from conversation id to history
#[derive(Default)]
pub struct ConversationStore {
    conversations: RwLock<HashMap<String, Arc<Slot>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, id: &str) -> StoreResult<Arc<Slot>> {
        self.conversations
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Look up a conversation, creating it when the id is absent or unknown.
    ///
    /// A missing or empty id gets a fresh UUID. An unknown caller-supplied id
    /// is created under that id.
    pub async fn get_or_create(&self, id: Option<&str>) -> (String, Vec<Message>) {
        let id = match id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => uuid::Uuid::new_v4().to_string(),
        };

        let slot = {
            let mut conversations = self.conversations.write().await;
            conversations
                .entry(id.clone())
                .or_insert_with(|| {
                    tracing::debug!(conv_id = %id, "Created conversation");
                    Arc::new(Slot::default())
                })
                .clone()
        };

        let history = slot.history.lock().await.clone();
        (id, history)
    }

    /// Append messages to the end of a conversation, preserving their order
    pub async fn append(
        &self,
        id: &str,
        messages: impl IntoIterator<Item = Message>,
    ) -> StoreResult<()> {
        let slot = self.slot(id).await?;
        slot.history.lock().await.extend(messages);
        Ok(())
    }

    /// Overwrite a history with a full sequence returned by the agent.
    ///
    /// The stored history must be a prefix of `full`; anything else would
    /// rewrite turns that already happened and is rejected without change.
    pub async fn replace_history(&self, id: &str, full: Vec<Message>) -> StoreResult<()> {
        let slot = self.slot(id).await?;
        let mut history = slot.history.lock().await;

        if !full.starts_with(&history) {
            return Err(StoreError::ProtocolViolation(format!(
                "replacement history of {} messages does not extend the {} stored for {id}",
                full.len(),
                history.len()
            )));
        }

        *history = full;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> StoreResult<Vec<Message>> {
        let slot = self.slot(id).await?;
        let history = slot.history.lock().await.clone();
        Ok(history)
    }

    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        if self.conversations.write().await.remove(id).is_none() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        tracing::debug!(conv_id = %id, "Deleted conversation");
        Ok(())
    }

    /// Wait for exclusive access to run a turn on `id`
    pub async fn lock_turn(&self, id: &str) -> StoreResult<TurnGuard> {
        let slot = self.slot(id).await?;
        let guard = slot.turn_lock.clone().lock_owned().await;
        Ok(TurnGuard { _guard: guard })
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.conversations.read().await.contains_key(id)
    }

    /// Number of live conversations
    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }
}
