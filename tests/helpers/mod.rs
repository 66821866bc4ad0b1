//! Test helpers module
//!
//! Shared setup for the integration tests: event builders and a test
//! context wiring the coordinator to in-memory collaborators and a
//! manually driven clock.

#![allow(dead_code)]

pub mod test_context;
pub mod test_data;

pub use test_context::*;
pub use test_data::*;
