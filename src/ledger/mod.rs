//! In-memory ledgers.
//!
//! Each ledger owns its lock; every mutation is a single critical section.
//! All capped ledgers evict oldest-first through [`BoundedLog`].

pub mod activity;
pub mod automation_log;
pub mod bounded;
pub mod compliance;
pub mod dedup;

pub use activity::ActivityFeed;
pub use automation_log::{AutomationLog, DEFAULT_AUTOMATION_LOG_CAP};
pub use bounded::BoundedLog;
pub use compliance::{ComplianceLedger, ComplianceSnapshot, MAX_SCORE, MIN_SCORE};
pub use dedup::DedupLedger;
