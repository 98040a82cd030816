//! Streaming delta reconciliation
//!
//! Turns a sequence of growing snapshots of the assistant's reply into the
//! chunks a client has not seen yet. Concatenating every chunk reproduces
//! the final snapshot whenever each snapshot extends the one before it.
//!
//! A snapshot that does not extend its predecessor (the agent replaced its
//! answer instead of growing it) is emitted whole. The client may then see
//! overlapping text, but no content is ever lost and the reconciler never
//! stalls on malformed input.

#[cfg(test)]
mod proptests;

/// Per-turn reconciliation state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaReconciler {
    emitted: String,
    fallbacks: usize,
}

impl DeltaReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next snapshot and return the chunk to emit, if any.
    ///
    /// Empty chunks are never returned.
    pub fn push(&mut self, snapshot: &str) -> Option<String> {
        let chunk = if self.emitted.is_empty() {
            snapshot.to_string()
        } else if let Some(suffix) = snapshot.strip_prefix(self.emitted.as_str()) {
            suffix.to_string()
        } else {
            self.fallbacks += 1;
            tracing::debug!(
                previous_len = self.emitted.len(),
                snapshot_len = snapshot.len(),
                "Snapshot does not extend emitted content, re-emitting in full"
            );
            snapshot.to_string()
        };

        snapshot.clone_into(&mut self.emitted);

        if chunk.is_empty() {
            None
        } else {
            Some(chunk)
        }
    }

    /// Content of the most recent snapshot
    pub fn emitted(&self) -> &str {
        &self.emitted
    }

    /// Number of snapshots that had to be re-emitted in full
    pub fn fallbacks(&self) -> usize {
        self.fallbacks
    }

    /// Finalized content of the turn
    pub fn finish(self) -> String {
        self.emitted
    }
}
