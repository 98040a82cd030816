//! HTTP API for the travel agent

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
pub use types::{ConversationRequest, ConversationResponse, DeleteResponse, ErrorResponse};

use crate::session::SessionCoordinator;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionCoordinator>,
}

impl AppState {
    pub fn new(session: Arc<SessionCoordinator>) -> Self {
        Self { session }
    }
}
