//! Crisis processing pipeline.
//!
//! Every batch of inbound messages flows through:
//! 1. `DedupLedger::should_process()` — each message id is handled once
//! 2. `CrisisClassifier::classify()` — AI verdict, keyword rules as fallback
//! 3. `resolve_priority()` — one crisis per batch
//! 4. `AutomationExecutor::execute()` — chain, store actions, compliance
//! 5. Incident record, templated reply, notification
//!
//! Stages are not transactional: a failed reply never rolls back the
//! incident or the score change.

pub mod monitor;
pub mod orchestrator;

pub use monitor::{MessageSource, poll_once, spawn_crisis_monitor};
pub use orchestrator::{CrisisPipeline, ManualCrisis, PipelineDeps};
