//! Background crisis monitor — polls a message source on a timer and runs
//! each batch through the pipeline.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::crisis::types::{PipelineResult, RawMessage};
use crate::error::ChannelError;
use crate::pipeline::orchestrator::CrisisPipeline;

/// Inbound channel adapter the monitor polls.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Source name for logs, e.g. `"imap"`.
    fn name(&self) -> &str;

    /// Up to `limit` unread messages, oldest first.
    async fn fetch_unread(&self, limit: usize) -> Result<Vec<RawMessage>, ChannelError>;

    /// Mark a message as handled at the source.
    async fn mark_read(&self, message_id: &str) -> Result<(), ChannelError>;
}

/// Spawn a background task that polls `source` every `interval`.
///
/// Returns a `JoinHandle` and shutdown flag. The first poll runs immediately.
pub fn spawn_crisis_monitor(
    pipeline: Arc<CrisisPipeline>,
    source: Arc<dyn MessageSource>,
    interval: Duration,
) -> (JoinHandle<()>, Arc<AtomicBool>) {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);

    let handle = tokio::spawn(async move {
        info!(
            source = source.name(),
            "Crisis monitor started — polling every {}s",
            interval.as_secs()
        );

        let mut tick = tokio::time::interval(interval);

        loop {
            tick.tick().await;

            if shutdown.load(Ordering::Relaxed) {
                info!("Crisis monitor shutting down");
                return;
            }

            poll_once(&pipeline, source.as_ref()).await;
        }
    });

    (handle, shutdown_flag)
}

/// Fetch one batch, process it and mark it read. `None` when nothing was fetched.
pub async fn poll_once(
    pipeline: &CrisisPipeline,
    source: &dyn MessageSource,
) -> Option<PipelineResult> {
    let messages = match source.fetch_unread(pipeline.config().max_batch_size).await {
        Ok(messages) => messages,
        Err(e) => {
            error!(source = source.name(), error = %e, "Failed to fetch messages");
            return None;
        }
    };

    if messages.is_empty() {
        debug!(source = source.name(), "No unread messages");
        return None;
    }

    let result = pipeline.process_full(&messages).await;

    // Every fetched id is now in the dedup ledger; leaving any unread would
    // pin it in front of the fetch limit on every later poll.
    for message in messages.iter().filter(|m| !m.id.trim().is_empty()) {
        if let Err(e) = source.mark_read(&message.id).await {
            warn!(message_id = %message.id, error = %e, "Failed to mark message read");
        }
    }

    Some(result)
}
