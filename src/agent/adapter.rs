//! Single point of contact with the agent capability
//!
//! Normalizes every agent failure, including a run that yields nothing, to
//! `AgentUnavailable`. No retries happen here.

use super::{Agent, AgentUnavailable, HistoryStream};
use crate::conversation::Message;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;

/// Agent snapshots with failures already normalized
pub type SnapshotStream = BoxStream<'static, Result<Vec<Message>, AgentUnavailable>>;

#[derive(Clone)]
pub struct AgentAdapter {
    agent: Arc<dyn Agent>,
}

impl AgentAdapter {
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self { agent }
    }

    /// Run a turn and return the final history
    pub async fn invoke(
        &self,
        thread_id: &str,
        history: Vec<Message>,
    ) -> Result<Vec<Message>, AgentUnavailable> {
        let start = Instant::now();
        let result = self.agent.invoke(thread_id, history).await;
        let duration_ms = start.elapsed().as_millis();

        match result {
            Ok(history) if history.is_empty() => {
                tracing::warn!(thread_id, mode = "invoke", duration_ms = %duration_ms, "Agent returned no result");
                Err(AgentUnavailable::new("agent returned no result"))
            }
            Ok(history) => {
                tracing::info!(
                    thread_id,
                    mode = "invoke",
                    messages = history.len(),
                    duration_ms = %duration_ms,
                    "Agent invocation completed"
                );
                Ok(history)
            }
            Err(e) => {
                tracing::error!(thread_id, mode = "invoke", duration_ms = %duration_ms, error = %e, "Agent invocation failed");
                Err(e.into())
            }
        }
    }

    /// Run a turn, yielding every snapshot as it arrives.
    ///
    /// An agent error ends the stream with one `AgentUnavailable` item; so
    /// does a run that yields no snapshot at all.
    pub fn invoke_streaming(&self, thread_id: &str, history: Vec<Message>) -> SnapshotStream {
        let state = StreamState {
            inner: Some(self.agent.stream(thread_id, history)),
            thread_id: thread_id.to_string(),
            snapshots: 0,
            start: Instant::now(),
        };

        futures::stream::unfold(state, |mut state| async move {
            let inner = state.inner.as_mut()?;
            match inner.next().await {
                Some(Ok(snapshot)) => {
                    state.snapshots += 1;
                    Some((Ok(snapshot), state))
                }
                Some(Err(e)) => {
                    state.inner = None;
                    tracing::error!(
                        thread_id = %state.thread_id,
                        mode = "stream",
                        snapshots = state.snapshots,
                        duration_ms = %state.start.elapsed().as_millis(),
                        error = %e,
                        "Agent stream failed"
                    );
                    Some((Err(e.into()), state))
                }
                None => {
                    state.inner = None;
                    if state.snapshots == 0 {
                        tracing::warn!(thread_id = %state.thread_id, mode = "stream", "Agent stream yielded nothing");
                        return Some((Err(AgentUnavailable::new("agent returned no result")), state));
                    }
                    tracing::info!(
                        thread_id = %state.thread_id,
                        mode = "stream",
                        snapshots = state.snapshots,
                        duration_ms = %state.start.elapsed().as_millis(),
                        "Agent stream completed"
                    );
                    None
                }
            }
        })
        .boxed()
    }
}

struct StreamState {
    inner: Option<HistoryStream>,
    thread_id: String,
    snapshots: usize,
    start: Instant,
}
