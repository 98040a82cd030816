//! Conversation turns
//!
//! Implements the Elm Architecture pattern: a pure turn state machine in
//! `turn`, driven by the effect executor in `coordinator`.

mod coordinator;
mod error;
pub mod turn;

#[cfg(test)]
mod proptests;

pub use coordinator::{SessionCoordinator, TurnOutcome};
pub use error::SessionError;
pub use turn::{transition, Effect, TurnEvent, TurnState};
