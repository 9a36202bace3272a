//! mockexam-core: Timed exam session engine, scoring, and service traits.
//!
//! This crate defines the session state machine, the item and result data
//! model, the objective score curve, and the traits the engine uses to reach
//! the generation, essay grading, and feedback services.

pub mod builder;
pub mod clock;
pub mod engine;
pub mod error;
pub mod grading;
pub mod ledger;
pub mod model;
pub mod orchestrator;
pub mod report;
pub mod scoring;
pub mod traits;

#[cfg(test)]
mod testing;
