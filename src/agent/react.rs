//! ReAct-style agent: alternate LLM rounds and tool calls until the model
//! answers without requesting a tool
//!
//! Tool exchanges live in a per-turn scratchpad and never reach the
//! conversation history. Each streamed text delta produces a snapshot of
//! `history + [assistant(text so far)]`.

use super::{Agent, AgentError, HistoryStream};
use crate::conversation::{Message, Role};
use crate::llm::{
    ContentBlock, LlmMessage, LlmRequest, LlmService, MessageRole, StreamEvent, ToolUse,
};
use crate::tools::{ToolContext, ToolOutput, ToolRegistry};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

/// Snapshots buffered ahead of a slow consumer
const SNAPSHOT_BUFFER: usize = 32;

pub const DEFAULT_MAX_STEPS: usize = 8;

type SnapshotSender = mpsc::Sender<Result<Vec<Message>, AgentError>>;

pub struct ReactAgent {
    llm: Arc<dyn LlmService>,
    tools: Arc<ToolRegistry>,
    max_steps: usize,
}

impl ReactAgent {
    pub fn new(llm: Arc<dyn LlmService>, tools: ToolRegistry, max_steps: usize) -> Self {
        Self {
            llm,
            tools: Arc::new(tools),
            max_steps: max_steps.max(1),
        }
    }
}

#[async_trait]
impl Agent for ReactAgent {
    fn stream(&self, thread_id: &str, history: Vec<Message>) -> HistoryStream {
        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
        let run = ReactRun {
            llm: self.llm.clone(),
            tools: self.tools.clone(),
            max_steps: self.max_steps,
            thread_id: thread_id.to_string(),
            history,
        };

        tokio::spawn(async move {
            if let Err(e) = run.execute(&tx).await {
                let _ = tx.send(Err(e)).await;
            }
        });

        ReceiverStream::new(rx).boxed()
    }
}

/// One turn of the agent loop
struct ReactRun {
    llm: Arc<dyn LlmService>,
    tools: Arc<ToolRegistry>,
    max_steps: usize,
    thread_id: String,
    history: Vec<Message>,
}

enum Round {
    Answered,
    ToolCalls { text: String, calls: Vec<ToolUse> },
    ConsumerGone,
}

impl ReactRun {
    async fn execute(self, tx: &SnapshotSender) -> Result<(), AgentError> {
        // Initial state is the input history itself
        if tx.send(Ok(self.history.clone())).await.is_err() {
            return Ok(());
        }

        let cancel = CancellationToken::new();
        let _cancel_tools = cancel.clone().drop_guard();
        let mut scratchpad: Vec<LlmMessage> = Vec::new();

        for step in 1..=self.max_steps {
            if tx.is_closed() {
                tracing::debug!(thread_id = %self.thread_id, step, "Snapshot consumer gone, stopping");
                return Ok(());
            }
            tracing::debug!(thread_id = %self.thread_id, step, "Agent step");

            match self.round(&scratchpad, tx).await? {
                Round::Answered | Round::ConsumerGone => return Ok(()),
                Round::ToolCalls { text, calls } => {
                    let mut assistant = Vec::new();
                    if !text.is_empty() {
                        assistant.push(ContentBlock::text(text));
                    }
                    let mut results = Vec::new();
                    for call in calls {
                        let output = self.run_tool(&call, &cancel).await;
                        results.push(ContentBlock::tool_result(
                            &call.id,
                            output.output,
                            !output.success,
                        ));
                        assistant.push(ContentBlock::tool_use(call.id, call.name, call.input));
                    }
                    scratchpad.push(LlmMessage {
                        role: MessageRole::Assistant,
                        content: assistant,
                    });
                    scratchpad.push(LlmMessage {
                        role: MessageRole::User,
                        content: results,
                    });
                }
            }
        }

        Err(AgentError::StepLimit(self.max_steps))
    }

    /// One LLM round, streaming text deltas out as snapshots
    async fn round(&self, scratchpad: &[LlmMessage], tx: &SnapshotSender) -> Result<Round, AgentError> {
        let request = LlmRequest {
            system: None,
            messages: self
                .history
                .iter()
                .map(to_llm_message)
                .chain(scratchpad.iter().cloned())
                .collect(),
            tools: self.tools.definitions(),
            max_tokens: None,
            temperature: Some(0.0),
        };

        let mut events = self.llm.complete_stream(&request).await?;
        let mut text = String::new();
        let mut calls = Vec::new();
        let mut completed = false;

        while let Some(event) = events.next().await {
            match event? {
                StreamEvent::TextDelta(delta) => {
                    text.push_str(&delta);
                    let mut snapshot = self.history.clone();
                    snapshot.push(Message::assistant(text.clone()));
                    if tx.send(Ok(snapshot)).await.is_err() {
                        return Ok(Round::ConsumerGone);
                    }
                }
                StreamEvent::ToolUse(call) => calls.push(call),
                StreamEvent::Done { .. } => {
                    completed = true;
                    break;
                }
            }
        }

        if !completed {
            return Err(AgentError::Stream(
                "model stream ended before the completion finished".to_string(),
            ));
        }

        if !calls.is_empty() {
            return Ok(Round::ToolCalls { text, calls });
        }
        if text.is_empty() {
            return Err(AgentError::Stream(
                "model ended the turn without a reply".to_string(),
            ));
        }
        Ok(Round::Answered)
    }

    async fn run_tool(&self, call: &ToolUse, cancel: &CancellationToken) -> ToolOutput {
        tracing::info!(thread_id = %self.thread_id, tool = %call.name, "Executing tool");
        let ctx = ToolContext::new(cancel.clone(), self.thread_id.as_str(), self.llm.clone());
        let output = self
            .tools
            .execute(&call.name, call.input.clone(), ctx)
            .await
            .unwrap_or_else(|| ToolOutput::error(format!("Unknown tool: {}", call.name)));

        if !output.success {
            tracing::warn!(thread_id = %self.thread_id, tool = %call.name, output = %output.output, "Tool failed");
        }
        output
    }
}

fn to_llm_message(message: &Message) -> LlmMessage {
    match message.role() {
        Role::User => LlmMessage::user(message.content()),
        Role::Assistant => LlmMessage::assistant(message.content()),
    }
}
