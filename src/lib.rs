//! Crisis Desk — crisis detection and remediation core.

pub mod automation;
pub mod config;
pub mod crisis;
pub mod error;
pub mod ledger;
pub mod llm;
pub mod notify;
pub mod pipeline;
pub mod state;
pub mod storefront;
