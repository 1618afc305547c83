//! Pipeline orchestration
//!
//! Runs the two stages in order and renders the container workflow that
//! schedules them as separate steps.

pub mod runner;
pub mod workflow;

pub use runner::{run_pipeline, PipelineOutcome};
pub use workflow::{compile_workflow, Component, Workflow};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
