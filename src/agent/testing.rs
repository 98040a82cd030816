//! Mock implementations for testing
//!
//! These mocks let the session, tool and HTTP layers run without a real
//! model behind them.

use super::{Agent, AgentError, HistoryStream};
use crate::conversation::Message;
use crate::llm::{
    response_events, ContentBlock, LlmError, LlmEventStream, LlmRequest, LlmResponse,
    LlmService, StreamEvent, Usage,
};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Mock LLM Service
// ============================================================================

enum MockReply {
    Response(Result<LlmResponse, LlmError>),
    Stream(Vec<Result<StreamEvent, LlmError>>),
}

/// Mock LLM service that returns queued replies in order
pub struct MockLlmService {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmService {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_response(&self, response: LlmResponse) {
        self.push(MockReply::Response(Ok(response)));
    }

    /// Queue a plain text answer that ends the turn
    pub fn queue_text(&self, text: &str) {
        self.queue_response(LlmResponse {
            content: vec![ContentBlock::text(text)],
            end_turn: true,
            usage: Usage::default(),
        });
    }

    /// Queue a reply that requests a single tool call
    pub fn queue_tool_call(&self, id: &str, name: &str, input: Value) {
        self.queue_response(LlmResponse {
            content: vec![ContentBlock::tool_use(id, name, input)],
            end_turn: false,
            usage: Usage::default(),
        });
    }

    /// Queue exact stream events for the next streaming call
    pub fn queue_stream(&self, events: Vec<StreamEvent>) {
        self.push(MockReply::Stream(events.into_iter().map(Ok).collect()));
    }

    /// Queue stream events cut short by `error`, the way a dropped
    /// provider connection ends
    pub fn queue_broken_stream(&self, events: Vec<StreamEvent>, error: LlmError) {
        let mut items: Vec<_> = events.into_iter().map(Ok).collect();
        items.push(Err(error));
        self.push(MockReply::Stream(items));
    }

    pub fn queue_error(&self, error: LlmError) {
        self.push(MockReply::Response(Err(error)));
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn push(&self, reply: MockReply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    fn next(&self, request: &LlmRequest) -> MockReply {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| MockReply::Response(Err(LlmError::network("No mock response queued"))))
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        match self.next(request) {
            MockReply::Response(result) => result,
            MockReply::Stream(events) => {
                let mut content = Vec::new();
                let mut end_turn = false;
                for event in events {
                    match event? {
                        StreamEvent::TextDelta(text) => content.push(ContentBlock::text(text)),
                        StreamEvent::ToolUse(t) => {
                            content.push(ContentBlock::tool_use(t.id, t.name, t.input));
                        }
                        StreamEvent::Done { end_turn: done, .. } => end_turn = done,
                    }
                }
                Ok(LlmResponse {
                    content,
                    end_turn,
                    usage: Usage::default(),
                })
            }
        }
    }

    async fn complete_stream(&self, request: &LlmRequest) -> Result<LlmEventStream, LlmError> {
        let events: Vec<Result<StreamEvent, LlmError>> = match self.next(request) {
            MockReply::Response(result) => response_events(result?).into_iter().map(Ok).collect(),
            MockReply::Stream(events) => events,
        };
        Ok(futures::stream::iter(events).boxed())
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}

// ============================================================================
// Mock Agent
// ============================================================================

/// One item of a scripted agent run
#[derive(Debug, Clone)]
pub enum MockStep {
    /// The input history unchanged
    Echo,
    /// The input history plus an assistant message with this content
    Partial(String),
    /// An arbitrary snapshot
    Raw(Vec<Message>),
    /// An agent error
    Fail(String),
}

/// Agent that replays queued scripts, one per call.
///
/// A call with no script queued yields nothing.
pub struct MockAgent {
    scripts: Mutex<VecDeque<Vec<MockStep>>>,
    calls: Mutex<Vec<(String, Vec<Message>)>>,
    delay: Option<Duration>,
}

impl MockAgent {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before every snapshot
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queue_script(&self, steps: Vec<MockStep>) {
        self.scripts.lock().unwrap().push_back(steps);
    }

    /// Queue a run that echoes the input, then grows a reply through `chunks`
    pub fn queue_reply(&self, chunks: &[&str]) {
        let mut steps = vec![MockStep::Echo];
        steps.extend(chunks.iter().map(|c| MockStep::Partial((*c).to_string())));
        self.queue_script(steps);
    }

    /// Thread ids and histories received, in call order
    pub fn recorded_calls(&self) -> Vec<(String, Vec<Message>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Agent for MockAgent {
    fn stream(&self, thread_id: &str, history: Vec<Message>) -> HistoryStream {
        self.calls
            .lock()
            .unwrap()
            .push((thread_id.to_string(), history.clone()));
        let script = self.scripts.lock().unwrap().pop_front().unwrap_or_default();

        let items: Vec<Result<Vec<Message>, AgentError>> = script
            .into_iter()
            .map(|step| match step {
                MockStep::Echo => Ok(history.clone()),
                MockStep::Partial(text) => {
                    let mut snapshot = history.clone();
                    snapshot.push(Message::assistant(text));
                    Ok(snapshot)
                }
                MockStep::Raw(snapshot) => Ok(snapshot),
                MockStep::Fail(message) => Err(AgentError::Stream(message)),
            })
            .collect();

        let items = futures::stream::iter(items);
        match self.delay {
            Some(delay) => items
                .then(move |item| async move {
                    tokio::time::sleep(delay).await;
                    item
                })
                .boxed(),
            None => items.boxed(),
        }
    }
}
