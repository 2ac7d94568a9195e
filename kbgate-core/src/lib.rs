//! kbgate Core
//!
//! Core types shared by the kbgate gateway and its worker client.
//!
//! This crate contains:
//! - Domain types: jobs, job outcomes and the supervised worker's status
//! - DTOs: the `{code, msg, ...}` envelope and the request/response shapes
//!   exchanged with callers and with the worker

pub mod domain;
pub mod dto;
