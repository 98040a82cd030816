//! Streamed chat completions (`stream: true`)
//!
//! The body is a Server-Sent Events feed of `data: {chunk}` frames ending
//! with `data: [DONE]`. Text deltas are passed through as they arrive; tool
//! call fragments are assembled by index and released once the completion
//! finishes.

use super::{parse_arguments, ChatUsage};
use crate::llm::types::{StreamEvent, ToolUse, Usage};
use crate::llm::{LlmError, LlmEventStream};
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Deserialize;
use std::collections::{BTreeMap, VecDeque};

const DONE_SENTINEL: &str = "[DONE]";

/// Turn a raw byte stream into completion events
pub(super) fn parse_chat_stream(
    bytes: BoxStream<'static, Result<Vec<u8>, LlmError>>,
) -> LlmEventStream {
    let state = ParseState {
        bytes,
        frames: SseFrames::default(),
        chunks: ChunkAccumulator::default(),
        pending: VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((event, state));
            }
            if state.done {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(bytes)) => match state.frames.push(&bytes) {
                    Ok(frames) => {
                        for data in frames {
                            state.handle_data(&data);
                        }
                    }
                    Err(e) => state.fail(e),
                },
                Some(Err(e)) => state.fail(e),
                None => {
                    if let Some(data) = state.frames.flush() {
                        state.handle_data(&data);
                    }
                    // A reply cut off before [DONE] is incomplete
                    state.fail(LlmError::network("stream closed before [DONE]"));
                }
            }
        }
    })
    .boxed()
}

struct ParseState {
    bytes: BoxStream<'static, Result<Vec<u8>, LlmError>>,
    frames: SseFrames,
    chunks: ChunkAccumulator,
    pending: VecDeque<Result<StreamEvent, LlmError>>,
    done: bool,
}

impl ParseState {
    fn handle_data(&mut self, data: &str) {
        if self.done {
            return;
        }
        if data.trim() == DONE_SENTINEL {
            self.finish();
            return;
        }

        match serde_json::from_str::<ChatChunk>(data) {
            Ok(chunk) => {
                let events = self.chunks.apply(chunk);
                self.pending.extend(events.into_iter().map(Ok));
            }
            Err(e) => self.fail(LlmError::unknown(format!(
                "Failed to parse stream chunk: {e} - data: {data}"
            ))),
        }
    }

    /// End the stream with `error` unless it already finished
    fn fail(&mut self, error: LlmError) {
        if !self.done {
            self.pending.push_back(Err(error));
            self.done = true;
        }
    }

    fn finish(&mut self) {
        if !self.done {
            self.pending
                .extend(self.chunks.finish().into_iter().map(Ok));
            self.done = true;
        }
    }
}

/// Splits an SSE byte feed into `data` payloads
#[derive(Default)]
struct SseFrames {
    buffer: String,
    utf8_buffer: Vec<u8>,
}

impl SseFrames {
    /// Append bytes and return every complete frame's data.
    ///
    /// Bytes that can never form valid UTF-8 end the stream with an error.
    fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>, LlmError> {
        self.utf8_buffer.extend_from_slice(bytes);
        let (valid_up_to, invalid) = match std::str::from_utf8(&self.utf8_buffer) {
            Ok(text) => (text.len(), false),
            // An incomplete trailing code point waits for the next push
            Err(e) => (e.valid_up_to(), e.error_len().is_some()),
        };
        if invalid {
            return Err(LlmError::unknown(format!(
                "Invalid UTF-8 in stream after {} buffered bytes",
                self.buffer.len() + valid_up_to
            )));
        }

        let text = String::from_utf8_lossy(&self.utf8_buffer[..valid_up_to]).replace('\r', "");
        self.buffer.push_str(&text);
        self.utf8_buffer.drain(..valid_up_to);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.find("\n\n") {
            let frame: String = self.buffer.drain(..pos + 2).collect();
            if let Some(data) = frame_data(&frame) {
                payloads.push(data);
            }
        }
        Ok(payloads)
    }

    /// Data of a trailing frame that never got its blank line
    fn flush(&mut self) -> Option<String> {
        let frame = std::mem::take(&mut self.buffer);
        frame_data(&frame)
    }
}

fn frame_data(frame: &str) -> Option<String> {
    let lines: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[derive(Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Assembles chunk deltas into stream events
#[derive(Default)]
struct ChunkAccumulator {
    tool_calls: BTreeMap<u32, PartialToolCall>,
    finish_reason: Option<String>,
    usage: Usage,
}

impl ChunkAccumulator {
    fn apply(&mut self, chunk: ChatChunk) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if let Some(usage) = chunk
            .usage
            .or_else(|| chunk.x_groq.and_then(|extra| extra.usage))
        {
            self.usage = usage.into_usage();
        }

        for choice in chunk.choices {
            if let Some(text) = choice.delta.content {
                if !text.is_empty() {
                    events.push(StreamEvent::TextDelta(text));
                }
            }

            for delta in choice.delta.tool_calls.unwrap_or_default() {
                let call = self.tool_calls.entry(delta.index).or_default();
                if let Some(id) = delta.id {
                    call.id = id;
                }
                if let Some(function) = delta.function {
                    if let Some(name) = function.name {
                        call.name.push_str(&name);
                    }
                    if let Some(arguments) = function.arguments {
                        call.arguments.push_str(&arguments);
                    }
                }
            }

            if let Some(reason) = choice.finish_reason {
                self.finish_reason = Some(reason);
            }
        }

        events
    }

    fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events: Vec<StreamEvent> = std::mem::take(&mut self.tool_calls)
            .into_values()
            .filter(|call| !call.name.is_empty())
            .map(|call| {
                StreamEvent::ToolUse(ToolUse {
                    id: call.id,
                    name: call.name,
                    input: parse_arguments(&call.arguments),
                })
            })
            .collect();

        events.push(StreamEvent::Done {
            end_turn: self.finish_reason.as_deref() == Some("stop"),
            usage: self.usage,
        });
        events
    }
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
    /// Groq reports usage here on the final chunk
    #[serde(default)]
    x_groq: Option<GroqExtra>,
}

#[derive(Debug, Deserialize)]
struct GroqExtra {
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<FunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct FunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmErrorKind;
    use serde_json::json;

    fn byte_stream(parts: Vec<&str>) -> BoxStream<'static, Result<Vec<u8>, LlmError>> {
        let owned: Vec<Result<Vec<u8>, LlmError>> =
            parts.into_iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        futures::stream::iter(owned).boxed()
    }

    async fn collect(parts: Vec<&str>) -> Vec<Result<StreamEvent, LlmError>> {
        parse_chat_stream(byte_stream(parts)).collect().await
    }

    fn text_frame(text: &str) -> String {
        format!(
            "data: {}\n\n",
            json!({"choices": [{"delta": {"content": text}, "finish_reason": null}]})
        )
    }

    #[tokio::test]
    async fn test_text_deltas_and_done() {
        let first = text_frame("Sure");
        let second = text_frame(", here");
        let finish = format!(
            "data: {}\n\n",
            json!({
                "choices": [{"delta": {}, "finish_reason": "stop"}],
                "x_groq": {"usage": {"prompt_tokens": 10, "completion_tokens": 4}}
            })
        );
        let events = collect(vec![first.as_str(), second.as_str(), finish.as_str(), "data: [DONE]\n\n"]).await;
        let events: Vec<StreamEvent> = events.into_iter().map(Result::unwrap).collect();

        assert_eq!(
            events,
            vec![
                StreamEvent::TextDelta("Sure".to_string()),
                StreamEvent::TextDelta(", here".to_string()),
                StreamEvent::Done {
                    end_turn: true,
                    usage: Usage {
                        input_tokens: 10,
                        output_tokens: 4
                    }
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_frames_split_across_reads() {
        let frame = text_frame("Kyoto");
        let (a, b) = frame.split_at(11);
        let events = collect(vec![a, b, "data: [DO", "NE]\n\n"]).await;
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].as_ref().unwrap(),
            &StreamEvent::TextDelta("Kyoto".to_string())
        );
    }

    #[tokio::test]
    async fn test_multibyte_split_across_reads() {
        let frame = text_frame("東京");
        let bytes = frame.as_bytes();
        // Split inside the first multibyte character
        let cut = frame.find('東').unwrap() + 1;
        let parts: Vec<Result<Vec<u8>, LlmError>> =
            vec![Ok(bytes[..cut].to_vec()), Ok(bytes[cut..].to_vec())];
        let events: Vec<_> = parse_chat_stream(futures::stream::iter(parts).boxed())
            .collect()
            .await;
        assert_eq!(
            events[0].as_ref().unwrap(),
            &StreamEvent::TextDelta("東京".to_string())
        );
    }

    #[tokio::test]
    async fn test_tool_call_fragments_assembled() {
        let frames = [
            json!({"choices": [{"delta": {"tool_calls": [{"index": 0, "id": "call-1", "function": {"name": "travel_planner", "arguments": ""}}]}}]}),
            json!({"choices": [{"delta": {"tool_calls": [{"index": 0, "function": {"arguments": "{\"query\":"}}]}}]}),
            json!({"choices": [{"delta": {"tool_calls": [{"index": 0, "function": {"arguments": "\"Japan\"}"}}]}}]}),
            json!({"choices": [{"delta": {}, "finish_reason": "tool_calls"}]}),
        ];
        let frames: Vec<String> = frames.iter().map(|f| format!("data: {f}\n\n")).collect();
        let mut parts: Vec<&str> = frames.iter().map(String::as_str).collect();
        parts.push("data: [DONE]\n\n");

        let events: Vec<StreamEvent> = collect(parts)
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();

        assert_eq!(
            events,
            vec![
                StreamEvent::ToolUse(ToolUse {
                    id: "call-1".to_string(),
                    name: "travel_planner".to_string(),
                    input: json!({"query": "Japan"}),
                }),
                StreamEvent::Done {
                    end_turn: false,
                    usage: Usage::default()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_closed_without_done_is_error() {
        let frame = text_frame("Day 1: Tok");
        let events = collect(vec![frame.as_str()]).await;
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].as_ref().unwrap(),
            &StreamEvent::TextDelta("Day 1: Tok".to_string())
        );
        let err = events[1].as_ref().unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::Network);
        assert!(err.message.contains("[DONE]"), "{}", err.message);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_error() {
        let parts: Vec<Result<Vec<u8>, LlmError>> = vec![
            Ok(text_frame("Day 1").into_bytes()),
            Ok(vec![0xFF]),
            Ok(text_frame(": Tokyo, Day 2: Kyoto").into_bytes()),
            Ok(b"data: [DONE]\n\n".to_vec()),
        ];
        let events: Vec<_> = parse_chat_stream(futures::stream::iter(parts).boxed())
            .collect()
            .await;
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].as_ref().unwrap(),
            &StreamEvent::TextDelta("Day 1".to_string())
        );
        assert_eq!(events[1].as_ref().unwrap_err().kind, LlmErrorKind::Unknown);
    }

    #[tokio::test]
    async fn test_comments_and_blank_frames_ignored() {
        let frame = text_frame("hi");
        let events = collect(vec![": keep-alive\n\n", frame.as_str(), "data: [DONE]\n\n"]).await;
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_chunk_is_error() {
        let events = collect(vec!["data: {not json}\n\n", "data: [DONE]\n\n"]).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap_err().kind, LlmErrorKind::Unknown);
    }

    #[tokio::test]
    async fn test_transport_error_ends_stream() {
        let parts: Vec<Result<Vec<u8>, LlmError>> = vec![
            Ok(text_frame("Hel").into_bytes()),
            Err(LlmError::network("reset")),
            Ok(text_frame("lo").into_bytes()),
        ];
        let events: Vec<_> = parse_chat_stream(futures::stream::iter(parts).boxed())
            .collect()
            .await;
        assert_eq!(events.len(), 2);
        assert!(events[0].is_ok());
        assert_eq!(events[1].as_ref().unwrap_err().kind, LlmErrorKind::Network);
    }
}
