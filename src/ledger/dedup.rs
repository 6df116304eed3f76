//! Deduplication ledger — ids of messages already inspected.

use std::collections::HashSet;

use tokio::sync::Mutex;
use tracing::debug;

/// Set of processed message ids.
#[derive(Debug, Default)]
pub struct DedupLedger {
    seen: Mutex<HashSet<String>>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically check-and-insert. Returns `true` the first time `id` is seen.
    pub async fn should_process(&self, id: &str) -> bool {
        let inserted = self.seen.lock().await.insert(id.to_string());
        if !inserted {
            debug!(message_id = %id, "Skipping already processed message");
        }
        inserted
    }

    /// Read-only membership check.
    pub async fn is_seen(&self, id: &str) -> bool {
        self.seen.lock().await.contains(id)
    }

    /// Forget every processed id.
    pub async fn reset(&self) -> usize {
        let mut seen = self.seen.lock().await;
        let cleared = seen.len();
        seen.clear();
        cleared
    }

    pub async fn len(&self) -> usize {
        self.seen.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.seen.lock().await.is_empty()
    }
}
