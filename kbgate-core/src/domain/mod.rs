//! Core domain types
//!
//! These types describe what the gateway runs (jobs) and what it supervises
//! (the worker process). They carry no behavior tied to a runtime.

pub mod job;
pub mod worker;
