//! Service layer
//!
//! Services combine repositories with the lifecycle rules and are the entry
//! point used by the CLI.

mod pipeline;

pub use pipeline::{NewPipeline, PipelineError, PipelineService};
