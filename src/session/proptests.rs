//! Property-based tests for the turn state machine

use super::turn::*;
use crate::conversation::Message;
use proptest::prelude::*;

// ============================================================================
// Generators
// ============================================================================

/// Prior history of completed turns
fn arb_prior_history() -> impl Strategy<Value = Vec<Message>> {
    proptest::collection::vec(("[a-z ]{1,10}", "[a-z ]{1,10}"), 0..4).prop_map(|turns| {
        turns
            .into_iter()
            .flat_map(|(user, reply)| [Message::user(user), Message::assistant(reply)])
            .collect()
    })
}

/// Reply snapshots, each extending the one before
fn arb_growing_reply() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-zA-Z ,.東]{1,6}", 1..8).prop_map(|pieces| {
        let mut current = String::new();
        pieces
            .into_iter()
            .map(|piece| {
                current.push_str(&piece);
                current.clone()
            })
            .collect()
    })
}

#[derive(Debug, Clone)]
enum Disruption {
    Fail,
    Timeout,
    Cancel,
}

fn arb_disruption() -> impl Strategy<Value = Disruption> {
    prop_oneof![
        Just(Disruption::Fail),
        Just(Disruption::Timeout),
        Just(Disruption::Cancel),
    ]
}

// ============================================================================
// Helpers
// ============================================================================

struct Trace {
    state: TurnState,
    chunks: Vec<String>,
    committed: Option<Vec<Message>>,
}

fn drive(prior: &[Message], user: &str, events: Vec<TurnEvent>) -> Trace {
    let mut trace = Trace {
        state: TurnState::Idle,
        chunks: Vec::new(),
        committed: None,
    };
    let first = TurnEvent::UserMessage {
        message: Message::user(user),
        prior_len: prior.len(),
    };

    for event in std::iter::once(first).chain(events) {
        let result = transition(trace.state, event).unwrap();
        for effect in result.effects {
            match effect {
                Effect::EmitChunk(chunk) => trace.chunks.push(chunk),
                Effect::CommitHistory(history) => trace.committed = Some(history),
                Effect::AppendUserMessage(_) | Effect::InvokeAgent => {}
            }
        }
        trace.state = result.new_state;
    }
    trace
}

fn reply_snapshots(prior: &[Message], user: &str, reply: &[String]) -> Vec<TurnEvent> {
    let mut sent = prior.to_vec();
    sent.push(Message::user(user));

    std::iter::once(TurnEvent::Snapshot {
        history: sent.clone(),
    })
    .chain(reply.iter().map(|text| {
        let mut history = sent.clone();
        history.push(Message::assistant(text.as_str()));
        TurnEvent::Snapshot { history }
    }))
    .collect()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_committed_history_extends_prior(
        prior in arb_prior_history(),
        reply in arb_growing_reply(),
    ) {
        let mut events = reply_snapshots(&prior, "next", &reply);
        events.push(TurnEvent::AgentFinished);
        let trace = drive(&prior, "next", events);

        let committed = trace.committed.unwrap();
        prop_assert_eq!(committed.len(), prior.len() + 2);
        prop_assert_eq!(&committed[..prior.len()], &prior[..]);
        prop_assert_eq!(&committed[prior.len()], &Message::user("next"));
        prop_assert!(committed[prior.len() + 1].is_assistant());
    }

    #[test]
    fn prop_streamed_chunks_equal_response(
        prior in arb_prior_history(),
        reply in arb_growing_reply(),
    ) {
        let mut events = reply_snapshots(&prior, "next", &reply);
        events.push(TurnEvent::AgentFinished);
        let trace = drive(&prior, "next", events);

        let last = reply.last().cloned().unwrap_or_default();
        prop_assert_eq!(trace.chunks.concat(), last.clone());
        match trace.state {
            TurnState::Committed { response, fallbacks } => {
                prop_assert_eq!(response, last);
                prop_assert_eq!(fallbacks, 0);
            }
            other => prop_assert!(false, "expected Committed, got {:?}", other),
        }
    }

    #[test]
    fn prop_disrupted_turn_never_commits(
        prior in arb_prior_history(),
        reply in arb_growing_reply(),
        cut in 0usize..8,
        disruption in arb_disruption(),
    ) {
        let mut events = reply_snapshots(&prior, "next", &reply);
        events.truncate(cut.min(events.len()));
        events.push(match disruption {
            Disruption::Fail => TurnEvent::AgentFailed { message: "boom".to_string() },
            Disruption::Timeout => TurnEvent::Aborted { reason: AbortReason::TimedOut },
            Disruption::Cancel => TurnEvent::Aborted { reason: AbortReason::Cancelled },
        });
        let trace = drive(&prior, "next", events);

        prop_assert!(trace.committed.is_none());
        let is_failed = matches!(trace.state, TurnState::Failed { .. });
        prop_assert!(is_failed);
    }

    #[test]
    fn prop_terminal_states_accept_nothing(reply in arb_growing_reply()) {
        let prior = Vec::new();
        let mut events = reply_snapshots(&prior, "next", &reply);
        events.push(TurnEvent::AgentFinished);
        let trace = drive(&prior, "next", events);

        let late = TurnEvent::Snapshot { history: vec![Message::assistant("late")] };
        prop_assert!(transition(trace.state.clone(), late).is_err());
        prop_assert!(transition(trace.state, TurnEvent::AgentFinished).is_err());
    }
}
