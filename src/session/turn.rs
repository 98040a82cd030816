//! Pure turn state machine
//!
//! One conversation turn: the user's message is recorded, the agent runs
//! over the full history, its snapshots are reconciled into output chunks,
//! and the final history is committed. The transition function performs no
//! I/O; the coordinator executes the effects it returns.

use crate::conversation::Message;
use crate::reconcile::DeltaReconciler;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnState {
    /// Nothing has happened yet
    Idle,

    /// User message recorded, no snapshot seen yet.
    /// `sent_len` is the history length handed to the agent.
    AwaitingAgent { sent_len: usize },

    /// Snapshots are arriving
    Reconciling {
        sent_len: usize,
        reconciler: DeltaReconciler,
        latest: Vec<Message>,
    },

    /// Final history committed
    Committed { response: String, fallbacks: usize },

    Failed { failure: TurnFailure },
}

impl TurnState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnState::Committed { .. } | TurnState::Failed { .. })
    }

    fn name(&self) -> &'static str {
        match self {
            TurnState::Idle => "Idle",
            TurnState::AwaitingAgent { .. } => "AwaitingAgent",
            TurnState::Reconciling { .. } => "Reconciling",
            TurnState::Committed { .. } => "Committed",
            TurnState::Failed { .. } => "Failed",
        }
    }
}

/// Why a turn ended without a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnFailure {
    AgentUnavailable(String),
    TimedOut,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    TimedOut,
    Cancelled,
}

/// Events that drive a turn
#[derive(Debug, Clone)]
pub enum TurnEvent {
    /// `prior_len` is the stored history length before this message
    UserMessage { message: Message, prior_len: usize },
    Snapshot { history: Vec<Message> },
    AgentFinished,
    AgentFailed { message: String },
    Aborted { reason: AbortReason },
}

impl TurnEvent {
    fn name(&self) -> &'static str {
        match self {
            TurnEvent::UserMessage { .. } => "UserMessage",
            TurnEvent::Snapshot { .. } => "Snapshot",
            TurnEvent::AgentFinished => "AgentFinished",
            TurnEvent::AgentFailed { .. } => "AgentFailed",
            TurnEvent::Aborted { .. } => "Aborted",
        }
    }
}

/// Effects to be executed after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    AppendUserMessage(Message),
    InvokeAgent,
    EmitChunk(String),
    CommitHistory(Vec<Message>),
}

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: TurnState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: TurnState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Invalid transition: {event} in state {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },
}

/// Pure transition function
pub fn transition(state: TurnState, event: TurnEvent) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        (TurnState::Idle, TurnEvent::UserMessage { message, prior_len }) => {
            Ok(TransitionResult::new(TurnState::AwaitingAgent {
                sent_len: prior_len + 1,
            })
            .with_effect(Effect::AppendUserMessage(message))
            .with_effect(Effect::InvokeAgent))
        }

        (TurnState::AwaitingAgent { sent_len }, TurnEvent::Snapshot { history }) => Ok(
            reconcile(sent_len, DeltaReconciler::new(), history),
        ),

        (
            TurnState::Reconciling {
                sent_len,
                reconciler,
                ..
            },
            TurnEvent::Snapshot { history },
        ) => Ok(reconcile(sent_len, reconciler, history)),

        (
            TurnState::Reconciling {
                sent_len,
                reconciler,
                latest,
            },
            TurnEvent::AgentFinished,
        ) => {
            if reply_content(&latest, sent_len).is_none() {
                return Ok(TransitionResult::new(failed(TurnFailure::AgentUnavailable(
                    "agent finished without a reply".to_string(),
                ))));
            }
            let fallbacks = reconciler.fallbacks();
            Ok(TransitionResult::new(TurnState::Committed {
                response: reconciler.finish(),
                fallbacks,
            })
            .with_effect(Effect::CommitHistory(latest)))
        }

        (TurnState::AwaitingAgent { .. }, TurnEvent::AgentFinished) => Ok(TransitionResult::new(
            failed(TurnFailure::AgentUnavailable("agent returned no result".to_string())),
        )),

        (
            TurnState::AwaitingAgent { .. } | TurnState::Reconciling { .. },
            TurnEvent::AgentFailed { message },
        ) => Ok(TransitionResult::new(failed(TurnFailure::AgentUnavailable(
            message,
        )))),

        (
            TurnState::AwaitingAgent { .. } | TurnState::Reconciling { .. },
            TurnEvent::Aborted { reason },
        ) => {
            let failure = match reason {
                AbortReason::TimedOut => TurnFailure::TimedOut,
                AbortReason::Cancelled => TurnFailure::Cancelled,
            };
            Ok(TransitionResult::new(failed(failure)))
        }

        (state, event) => Err(TransitionError::InvalidTransition {
            state: state.name(),
            event: event.name(),
        }),
    }
}

fn failed(failure: TurnFailure) -> TurnState {
    TurnState::Failed { failure }
}

fn reconcile(sent_len: usize, mut reconciler: DeltaReconciler, history: Vec<Message>) -> TransitionResult {
    let chunk = reply_content(&history, sent_len).and_then(|content| reconciler.push(content));
    let result = TransitionResult::new(TurnState::Reconciling {
        sent_len,
        reconciler,
        latest: history,
    });
    match chunk {
        Some(chunk) => result.with_effect(Effect::EmitChunk(chunk)),
        None => result,
    }
}

/// Content of the agent's reply in `history`, if it has one yet
fn reply_content(history: &[Message], sent_len: usize) -> Option<&str> {
    if history.len() <= sent_len {
        return None;
    }
    history
        .last()
        .filter(|m| m.is_assistant())
        .map(Message::content)
}
