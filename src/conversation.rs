//! Conversation history
//!
//! Messages are immutable values; the store owns every history and is the
//! only place a conversation is mutated.

mod message;
mod store;

pub use message::{Message, Role};
pub use store::{ConversationStore, StoreError, StoreResult, TurnGuard};
