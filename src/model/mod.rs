//! Core data model shared by every component.
//!
//! Kept as one module so the Iteration Executor, Champion Tracker, and
//! Feedback Composer can all depend on a single set of types without
//! circular module edges.

pub mod types;

pub use types::*;
