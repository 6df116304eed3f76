//! Activity feed — human-readable events for operators.

use chrono::Utc;
use tokio::sync::RwLock;

use crate::crisis::types::{ActivityCategory, ActivityEvent, ActivityLevel};
use crate::ledger::bounded::BoundedLog;

struct FeedInner {
    events: BoundedLog<ActivityEvent>,
    next_id: u64,
}

/// Capped, append-only activity log.
pub struct ActivityFeed {
    inner: RwLock<FeedInner>,
}

impl ActivityFeed {
    pub fn new(cap: usize) -> Self {
        Self {
            inner: RwLock::new(FeedInner {
                events: BoundedLog::new(cap),
                next_id: 1,
            }),
        }
    }

    /// Append an event. Returns its id.
    pub async fn record(
        &self,
        category: ActivityCategory,
        message: impl Into<String>,
        severity: ActivityLevel,
    ) -> u64 {
        let mut inner = self.inner.write().await;
        let id = inner.next_id;
        inner.next_id += 1;
        inner.events.push(ActivityEvent {
            id,
            category,
            message: message.into(),
            severity,
            timestamp: Utc::now(),
        });
        id
    }

    /// Events, newest first (as a feed is displayed).
    pub async fn recent(&self) -> Vec<ActivityEvent> {
        self.inner.read().await.events.newest_first()
    }

    /// Events, oldest first.
    pub async fn snapshot(&self) -> Vec<ActivityEvent> {
        self.inner.read().await.events.snapshot()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.events.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.events.is_empty()
    }
}
