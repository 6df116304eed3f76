//! Automation dispatch.
//!
//! The taxonomy names the chain; the registry maps each name to a handler;
//! the executor runs the chain with per-step failure isolation.

pub mod executor;
pub mod handler;
pub mod registry;

pub use executor::AutomationExecutor;
pub use handler::{AutomationContext, AutomationHandler, FnHandler, builtin_handlers};
pub use registry::HandlerRegistry;
