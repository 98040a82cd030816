//! Server-Sent Events for streamed chat turns

use super::types::ConversationResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::DropGuard;

/// What a streamed turn reports to the client
#[derive(Debug, Clone)]
pub enum TurnStreamEvent {
    /// New reply text the client has not seen yet
    Delta(String),
    /// The turn committed
    Done(ConversationResponse),
    /// The turn failed; nothing was committed
    Error(String),
}

/// Convert a turn's event channel to an SSE response.
///
/// `cancel_on_drop` is released when the client goes away, which cancels
/// the turn behind the channel.
pub fn turn_stream(
    events: mpsc::UnboundedReceiver<TurnStreamEvent>,
    cancel_on_drop: DropGuard,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = futures::stream::unfold((events, cancel_on_drop), |(mut events, guard)| async move {
        let event = events.recv().await?;
        Some((Ok(turn_event_to_axum(event)), (events, guard)))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn turn_event_to_axum(event: TurnStreamEvent) -> Event {
    let (event_type, data) = match event {
        TurnStreamEvent::Delta(text) => (
            "delta",
            json!({
                "type": "delta",
                "text": text
            }),
        ),
        TurnStreamEvent::Done(response) => (
            "done",
            json!({
                "type": "done",
                "conversation_id": response.conversation_id,
                "response": response.response,
                "messages": response.messages
            }),
        ),
        TurnStreamEvent::Error(detail) => (
            "error",
            json!({
                "type": "error",
                "detail": detail
            }),
        ),
    };

    Event::default().event(event_type).data(data.to_string())
}
