//! strataloop — an autonomous strategy iteration engine.
//!
//! Proposes, validates, sandboxes, scores, and champions quantitative
//! trading strategies in a closed loop: a Composer distills the current
//! Champion and recent history into structured guidance, an external
//! Proposer turns that into a candidate strategy, the Static Validator and
//! Field Manifest reject malformed or schema-violating candidates before
//! anything executes, the Sandbox Executor and Runtime Monitor run what
//! survives under resource isolation, and the Champion Tracker decides
//! whether the result unseats the incumbent.
//!
//! See `DESIGN.md` for the grounding ledger behind each module's
//! implementation choices.

#![allow(dead_code)]
#![allow(clippy::uninlined_format_args)]

pub mod alerts;
pub mod champion_tracker;
pub mod cli;
pub mod config;
pub mod diversity;
pub mod executor;
pub mod failure_patterns;
pub mod feedback;
pub mod field_manifest;
pub mod history;
pub mod metrics_extractor;
pub mod model;
pub mod outcome_classifier;
pub mod proposer;
pub mod runtime_monitor;
pub mod sandbox;
pub mod validator;

pub use config::{Config, ConfigError, ConfigResult};
pub use executor::{ExecutorError, ExecutorResult, IterationExecutor};
pub use model::*;
