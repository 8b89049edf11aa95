//! covwatch core — continuous coverage generation engine.
//!
//! Watches compiled test assemblies under a solution tree and, on change,
//! stages the binaries, runs a coverage-instrumented test pass and
//! regenerates the report, while suppressing the re-entrant triggers its
//! own file writes would otherwise cause.
//!
//! The moving parts, leaves first:
//! - [`solution`]: solution/project directory classification
//! - [`resolve`]: `bin/<config>` build output resolution
//! - [`args`]: byte-exact argument strings for the coverage tool
//! - [`config`]: external tool settings, validated at startup
//! - [`runner`]: external process invocation with captured output
//! - [`watch`]: filesystem watches with a shared suspend/resume gate
//! - [`pipeline`]: the run orchestrator
//! - [`worker`]: trigger channel and the dedicated pipeline worker

pub mod args;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod resolve;
pub mod runner;
pub mod solution;
pub mod telemetry;
pub mod watch;
pub mod worker;

// Re-export key types
pub use config::ToolSettings;
pub use error::{ConfigError, ProcessError, StructureError, WatchError};
pub use pipeline::{
    CoveragePipeline, PipelineError, PipelineResult, PipelineStep, RunLayout,
};
pub use resolve::resolve_output_dirs;
pub use runner::{ToolInvocation, ToolOutput};
pub use telemetry::init_tracing;
pub use watch::{WatchCoordinator, WatchGate};
pub use worker::{trigger_channel, PipelineWorker, TriggerReceiver, TriggerSender};
