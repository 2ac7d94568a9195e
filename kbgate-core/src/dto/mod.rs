//! Data transfer objects
//!
//! Wire shapes for the gateway's HTTP API and for the worker's HTTP API.

pub mod envelope;
pub mod gateway;
pub mod worker;
