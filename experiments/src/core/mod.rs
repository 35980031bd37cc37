//! Deterministic, pure logic for planning experiments.
//!
//! Core modules must be free of I/O side effects. They map requests to unit
//! keys, unit keys to paths, and paths to command lines.

pub mod call;
pub mod layout;
pub mod plan;
pub mod types;
pub mod validate;
