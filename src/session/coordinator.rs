//! Turn executor
//!
//! Drives the pure turn state machine: feeds it events from the agent,
//! executes the effects it returns against the store and the output sink.

use super::turn::{transition, AbortReason, Effect, TurnEvent, TurnState};
use super::SessionError;
use crate::agent::{AgentAdapter, SnapshotStream};
use crate::config::SessionConfig;
use crate::conversation::{ConversationStore, Message};
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Result of a committed turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnOutcome {
    pub conversation_id: String,
    /// Final content of the agent's reply
    pub response: String,
    /// Full history after the turn
    pub messages: Vec<Message>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum InvokeMode {
    Invoke,
    Stream,
}

impl InvokeMode {
    fn as_str(self) -> &'static str {
        match self {
            InvokeMode::Invoke => "invoke",
            InvokeMode::Stream => "stream",
        }
    }
}

/// Mutable context of one running turn
struct TurnRun<'a> {
    conv_id: String,
    mode: InvokeMode,
    on_chunk: &'a mut (dyn FnMut(String) + Send),
    snapshots: Option<SnapshotStream>,
    committed: Option<Vec<Message>>,
}

pub struct SessionCoordinator {
    store: Arc<ConversationStore>,
    adapter: AgentAdapter,
    config: SessionConfig,
}

impl SessionCoordinator {
    pub fn new(store: Arc<ConversationStore>, adapter: AgentAdapter, config: SessionConfig) -> Self {
        Self {
            store,
            adapter,
            config,
        }
    }

    /// Run one turn and return the finalized reply.
    ///
    /// An absent or empty `conversation_id` starts a new conversation.
    pub async fn chat(
        &self,
        conversation_id: Option<String>,
        text: String,
    ) -> Result<TurnOutcome, SessionError> {
        let mut discard = |_chunk: String| {};
        self.run_turn(
            conversation_id,
            text,
            InvokeMode::Invoke,
            &mut discard,
            CancellationToken::new(),
        )
        .await
    }

    /// Run one turn, handing each new piece of the reply to `on_chunk` as it
    /// arrives. Firing `cancel` abandons the turn without committing.
    pub async fn chat_streaming<F>(
        &self,
        conversation_id: Option<String>,
        text: String,
        mut on_chunk: F,
        cancel: CancellationToken,
    ) -> Result<TurnOutcome, SessionError>
    where
        F: FnMut(String) + Send,
    {
        self.run_turn(conversation_id, text, InvokeMode::Stream, &mut on_chunk, cancel)
            .await
    }

    pub async fn history(&self, conversation_id: &str) -> Result<Vec<Message>, SessionError> {
        Ok(self.store.get(conversation_id).await?)
    }

    pub async fn delete(&self, conversation_id: &str) -> Result<(), SessionError> {
        self.store.delete(conversation_id).await?;
        let remaining = self.store.len().await;
        tracing::info!(
            conv_id = %conversation_id,
            remaining,
            "Conversation deleted"
        );
        Ok(())
    }

    async fn run_turn(
        &self,
        conversation_id: Option<String>,
        text: String,
        mode: InvokeMode,
        on_chunk: &mut (dyn FnMut(String) + Send),
        cancel: CancellationToken,
    ) -> Result<TurnOutcome, SessionError> {
        let resumed = match conversation_id.as_deref() {
            Some(id) if !id.is_empty() => self.store.contains(id).await,
            _ => false,
        };
        let (conv_id, _) = self.store.get_or_create(conversation_id.as_deref()).await;
        let span = tracing::info_span!(
            "turn",
            conv_id = %conv_id,
            mode = mode.as_str(),
            resumed
        );

        let run = TurnRun {
            conv_id,
            mode,
            on_chunk,
            snapshots: None,
            committed: None,
        };
        self.execute_turn(run, text, cancel).instrument(span).await
    }

    async fn execute_turn(
        &self,
        mut run: TurnRun<'_>,
        text: String,
        cancel: CancellationToken,
    ) -> Result<TurnOutcome, SessionError> {
        let start = Instant::now();
        let _turn = self.store.lock_turn(&run.conv_id).await?;
        let prior_len = self.store.get(&run.conv_id).await?.len();
        tracing::info!(prior_len, "Turn started");

        let mut state = self
            .apply(
                &mut run,
                TurnState::Idle,
                TurnEvent::UserMessage {
                    message: Message::user(text),
                    prior_len,
                },
            )
            .await?;

        let deadline = tokio::time::Instant::now() + self.config.turn_timeout;

        while !state.is_terminal() {
            let Some(snapshots) = run.snapshots.as_mut() else {
                return Err(SessionError::AgentUnavailable(
                    "agent was never invoked".to_string(),
                ));
            };

            let event = tokio::select! {
                biased;

                () = cancel.cancelled() => TurnEvent::Aborted { reason: AbortReason::Cancelled },

                () = tokio::time::sleep_until(deadline) => TurnEvent::Aborted { reason: AbortReason::TimedOut },

                item = snapshots.next() => match item {
                    Some(Ok(history)) => TurnEvent::Snapshot { history },
                    Some(Err(e)) => TurnEvent::AgentFailed { message: e.message },
                    None => TurnEvent::AgentFinished,
                },
            };

            state = self.apply(&mut run, state, event).await?;
        }

        // Stop the agent if it is still running
        drop(run.snapshots.take());

        match state {
            TurnState::Committed {
                response,
                fallbacks,
            } => {
                let messages = run.committed.take().unwrap_or_default();
                tracing::info!(
                    messages = messages.len(),
                    response_len = response.len(),
                    fallbacks,
                    duration_ms = %start.elapsed().as_millis(),
                    "Turn committed"
                );
                Ok(TurnOutcome {
                    conversation_id: run.conv_id,
                    response,
                    messages,
                })
            }
            TurnState::Failed { failure } => {
                let err = SessionError::from(failure);
                tracing::warn!(
                    error = %err,
                    duration_ms = %start.elapsed().as_millis(),
                    "Turn failed, user message kept without reply"
                );
                Err(err)
            }
            _ => Err(SessionError::AgentUnavailable(
                "turn ended in a non-terminal state".to_string(),
            )),
        }
    }

    /// Transition, then execute the resulting effects in order
    async fn apply(
        &self,
        run: &mut TurnRun<'_>,
        state: TurnState,
        event: TurnEvent,
    ) -> Result<TurnState, SessionError> {
        let result = transition(state, event)?;

        for effect in result.effects {
            match effect {
                Effect::AppendUserMessage(message) => {
                    self.store.append(&run.conv_id, [message]).await?;
                }
                Effect::InvokeAgent => {
                    let history = self.store.get(&run.conv_id).await?;
                    run.snapshots = Some(self.open_agent(run.mode, &run.conv_id, history));
                }
                Effect::EmitChunk(chunk) => (run.on_chunk)(chunk),
                Effect::CommitHistory(history) => {
                    self.store
                        .replace_history(&run.conv_id, history.clone())
                        .await?;
                    run.committed = Some(history);
                }
            }
        }

        Ok(result.new_state)
    }

    fn open_agent(&self, mode: InvokeMode, conv_id: &str, history: Vec<Message>) -> SnapshotStream {
        match mode {
            InvokeMode::Stream => self.adapter.invoke_streaming(conv_id, history),
            InvokeMode::Invoke => {
                let adapter = self.adapter.clone();
                let thread_id = conv_id.to_string();
                futures::stream::once(async move { adapter.invoke(&thread_id, history).await })
                    .boxed()
            }
        }
    }
}
