//! Service Module
//!
//! Business logic of the gateway: the gated job runner, the ungated query
//! runner and the worker supervisor. Handlers in `api` call into these.

pub mod query;
pub mod runner;
pub mod supervisor;

// Re-export for convenience
pub use runner::{JobError, JobRunner};
pub use supervisor::{HttpHealthProbe, Supervisor};
