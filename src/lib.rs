//! Travel planning assistant
//!
//! Multi-conversation session service in front of a tool-using LLM agent.
//! Each turn replays the conversation's full history to the agent, turns
//! the agent's growing reply into non-overlapping deltas and commits the
//! final history.

pub mod agent;
pub mod api;
pub mod app;
pub mod config;
pub mod conversation;
pub mod llm;
pub mod reconcile;
pub mod session;
pub mod tools;
