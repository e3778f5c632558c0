//! forumsage-pipeline
//!
//! Sequences corpus search, specialist dispatch and aggregation into one
//! total `process(question)` call, plus batch reporting over many results.

pub mod aggregate;
pub mod orchestrator;
pub mod report;

pub use aggregate::{Aggregator, Synthesis, SynthesisSource, NO_RESPONSES_MESSAGE};
pub use orchestrator::Orchestrator;
pub use report::{BatchReport, ResponderStats};
