//! Crisis detection.
//!
//! Every inbound message flows through:
//! 1. `CrisisClassifier::classify()` — AI verdict first, keyword rules as fallback
//! 2. `resolve_priority()` — one candidate per batch, highest severity first
//! 3. `generate_response()` — templated reply once automations have run
//!
//! The taxonomy is the single source of automation chains, compliance
//! impacts and store actions.

pub mod classifier;
pub mod priority;
pub mod response;
pub mod taxonomy;
pub mod types;

pub use classifier::{ClassificationStrategy, CrisisClassifier, LlmClassifier, RuleClassifier};
pub use priority::resolve_priority;
pub use response::{generate_response, reply_subject};
pub use taxonomy::{CrisisTaxonomy, CrisisType, Severity, StoreActionKind, TaxonomyEntry};
pub use types::*;
