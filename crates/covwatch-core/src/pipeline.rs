//! Coverage pipeline orchestration.
//!
//! A run suspends the watch set, stages compiled binaries into an isolated
//! staging directory, invokes the coverage tool (wrapping the test runner)
//! and then the report generator, removes the staging directory, and
//! re-arms the watches. Re-arming happens unconditionally: a failed run
//! must never leave the system blind to further changes.

use crate::args;
use crate::config::ToolSettings;
use crate::error::ProcessError;
use crate::runner::{run_tool, ToolInvocation, ToolOutput};
use crate::watch::WatchGate;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Suffix identifying test assemblies among staged binaries.
pub const TEST_ASSEMBLY_SUFFIX: &str = ".Test.dll";

/// Coverage data file written into the report output directory.
pub const COVERAGE_FILE: &str = "coverage.xml";

/// Default staging directory, relative to the working directory.
pub const DEFAULT_STAGING_DIR: &str = "temp";

/// Default report output directory, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "CodeCoverage";

/// Where a run stages binaries and writes reports.
#[derive(Debug, Clone)]
pub struct RunLayout {
    /// Staging directory; recreated fresh for every run.
    pub staging_dir: PathBuf,

    /// Report output directory; created once, reused across runs.
    pub output_dir: PathBuf,
}

impl Default for RunLayout {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

/// The pipeline step a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    /// Recreating the staging directory.
    PrepareStaging,
    /// Creating the report output directory.
    PrepareOutput,
    /// Copying binaries into staging.
    StageBinaries,
    /// Coverage tool invocation.
    Coverage,
    /// Report generator invocation.
    Report,
    /// Removing the staging directory.
    CleanupStaging,
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStep::PrepareStaging => "staging directory preparation",
            PipelineStep::PrepareOutput => "output directory preparation",
            PipelineStep::StageBinaries => "binary staging",
            PipelineStep::Coverage => "coverage tool run",
            PipelineStep::Report => "report generation",
            PipelineStep::CleanupStaging => "staging directory cleanup",
        };
        f.write_str(name)
    }
}

/// A coverage run failed.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("a coverage run is already in progress")]
    AlreadyRunning,

    #[error("{step} failed: {source}")]
    Io {
        step: PipelineStep,
        #[source]
        source: std::io::Error,
    },

    #[error("{step} failed: {source}")]
    Tool {
        step: PipelineStep,
        #[source]
        source: ProcessError,
    },
}

impl PipelineError {
    /// The step this failure is attributed to, if any.
    pub fn step(&self) -> Option<PipelineStep> {
        match self {
            PipelineError::AlreadyRunning => None,
            PipelineError::Io { step, .. } | PipelineError::Tool { step, .. } => Some(*step),
        }
    }

    /// Captured `(stdout, stderr)` of the failing tool, where available.
    pub fn captured_output(&self) -> Option<(&str, &str)> {
        match self {
            PipelineError::Tool {
                source: ProcessError::NonZeroExit { stdout, stderr, .. },
                ..
            } => Some((stdout, stderr)),
            _ => None,
        }
    }
}

/// Outcome of one complete coverage run.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Unique id of this run.
    pub run_id: String,

    /// When the run was triggered.
    pub started_at: DateTime<Utc>,

    /// Number of files copied into staging.
    pub staged_files: usize,

    /// Test assembly names handed to the coverage tool, sorted.
    pub test_assemblies: Vec<String>,

    /// Captured outputs of the coverage tool and the report generator.
    pub tools: Vec<ToolOutput>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

/// Coverage pipeline orchestrator.
///
/// At most one run executes at a time; a trigger arriving while a run is
/// in progress is rejected with [`PipelineError::AlreadyRunning`] (the
/// worker's trigger channel queues at most one follow-up instead).
pub struct CoveragePipeline {
    settings: ToolSettings,
    layout: RunLayout,
    gate: Arc<WatchGate>,
    run_lock: Mutex<()>,
}

impl CoveragePipeline {
    pub fn new(settings: ToolSettings, layout: RunLayout, gate: Arc<WatchGate>) -> Self {
        Self {
            settings,
            layout,
            gate,
            run_lock: Mutex::new(()),
        }
    }

    /// Execute one coverage run over the resolved output directories.
    pub async fn run(
        &self,
        output_dirs: &BTreeMap<String, PathBuf>,
    ) -> Result<PipelineResult, PipelineError> {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| PipelineError::AlreadyRunning)?;

        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let start = Instant::now();

        info!(run_id = %run_id, "starting coverage run");

        // Watches stay dark for the whole run so our own staging writes
        // and tool output cannot re-trigger the pipeline.
        self.gate.suspend();
        let outcome = self.run_inner(output_dirs).await;
        self.gate.resume();

        match outcome {
            Ok((staged_files, test_assemblies, tools)) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                info!(run_id = %run_id, duration_ms, "coverage run finished");
                Ok(PipelineResult {
                    run_id,
                    started_at,
                    staged_files,
                    test_assemblies,
                    tools,
                    duration_ms,
                })
            }
            Err(err) => {
                warn!(run_id = %run_id, error = %err, "coverage run failed");
                Err(err)
            }
        }
    }

    async fn run_inner(
        &self,
        output_dirs: &BTreeMap<String, PathBuf>,
    ) -> Result<(usize, Vec<String>, Vec<ToolOutput>), PipelineError> {
        let staging = &self.layout.staging_dir;

        // Fresh staging directory; a stale one from a crashed run is
        // removed first.
        if path_exists(staging).await {
            fs::remove_dir_all(staging)
                .await
                .map_err(io_err(PipelineStep::PrepareStaging))?;
        }
        fs::create_dir_all(staging)
            .await
            .map_err(io_err(PipelineStep::PrepareStaging))?;

        let outcome = self.execute(output_dirs).await;

        // This run created the staging directory, so it is removed again
        // whatever the outcome.
        let cleanup = fs::remove_dir_all(staging)
            .await
            .map_err(io_err(PipelineStep::CleanupStaging));

        match (outcome, cleanup) {
            (Ok(result), Ok(())) => Ok(result),
            (Err(err), _) => Err(err),
            (Ok(_), Err(err)) => Err(err),
        }
    }

    /// Stage binaries, then run the coverage tool and the report generator.
    async fn execute(
        &self,
        output_dirs: &BTreeMap<String, PathBuf>,
    ) -> Result<(usize, Vec<String>, Vec<ToolOutput>), PipelineError> {
        fs::create_dir_all(&self.layout.output_dir)
            .await
            .map_err(io_err(PipelineStep::PrepareOutput))?;

        let staged = self.stage_binaries(output_dirs).await?;

        let test_assemblies: Vec<String> = staged
            .iter()
            .filter(|name| name.ends_with(TEST_ASSEMBLY_SUFFIX))
            .cloned()
            .collect();
        if test_assemblies.is_empty() {
            warn!("no test assemblies found among staged binaries");
        }

        let target_args = args::target_args(&test_assemblies);
        let filters = args::coverage_filters(&test_assemblies);
        let coverage_file = self.layout.output_dir.join(COVERAGE_FILE);

        let coverage = ToolInvocation {
            tool: "coverage_tool".to_string(),
            program: self.settings.coverage_tool.clone(),
            args: vec![
                format!("-target:{}", self.settings.test_runner.display()),
                format!("-targetdir:{}", self.layout.staging_dir.display()),
                format!("-targetargs:{target_args}"),
                format!("-filter:{filters}"),
                format!("-output:{}", coverage_file.display()),
                "-register:user".to_string(),
            ],
        };
        let coverage_output = run_tool(&coverage, self.settings.timeout())
            .await
            .map_err(tool_err(PipelineStep::Coverage))?;
        info!(
            tool = %coverage_output.tool,
            duration_ms = coverage_output.duration_ms,
            "coverage tool finished"
        );

        let report = ToolInvocation {
            tool: "report_generator".to_string(),
            program: self.settings.report_generator.clone(),
            args: vec![
                format!("-reports:{}", coverage_file.display()),
                format!("-targetdir:{}", self.layout.output_dir.display()),
            ],
        };
        let report_output = run_tool(&report, self.settings.timeout())
            .await
            .map_err(tool_err(PipelineStep::Report))?;
        info!(
            tool = %report_output.tool,
            duration_ms = report_output.duration_ms,
            "report generated"
        );

        Ok((
            staged.len(),
            test_assemblies,
            vec![coverage_output, report_output],
        ))
    }

    /// Copy every file from every resolved output directory into staging,
    /// skipping names already present there.
    async fn stage_binaries(
        &self,
        output_dirs: &BTreeMap<String, PathBuf>,
    ) -> Result<Vec<String>, PipelineError> {
        let io = io_err(PipelineStep::StageBinaries);
        let mut staged = Vec::new();

        for (project, dir) in output_dirs {
            let mut entries = fs::read_dir(dir).await.map_err(io)?;
            while let Some(entry) = entries.next_entry().await.map_err(io)? {
                if !entry.file_type().await.map_err(io)?.is_file() {
                    continue;
                }

                let name = entry.file_name().to_string_lossy().into_owned();
                let dest = self.layout.staging_dir.join(&name);
                if path_exists(&dest).await {
                    continue;
                }

                fs::copy(entry.path(), &dest).await.map_err(io)?;
                staged.push(name);
            }
            debug!(project = %project, "staged build output");
        }

        staged.sort();
        Ok(staged)
    }
}

fn io_err(step: PipelineStep) -> impl Fn(std::io::Error) -> PipelineError + Copy {
    move |source| PipelineError::Io { step, source }
}

fn tool_err(step: PipelineStep) -> impl FnOnce(ProcessError) -> PipelineError {
    move |source| PipelineError::Tool { step, source }
}

async fn path_exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_is_attributed_on_io_failures() {
        let err = PipelineError::Io {
            step: PipelineStep::StageBinaries,
            source: std::io::Error::other("disk on fire"),
        };
        assert_eq!(err.step(), Some(PipelineStep::StageBinaries));
        assert!(err.captured_output().is_none());
    }

    #[test]
    fn captured_output_is_exposed_for_tool_failures() {
        let err = PipelineError::Tool {
            step: PipelineStep::Coverage,
            source: ProcessError::NonZeroExit {
                tool: "coverage_tool".to_string(),
                exit_code: 3,
                stdout: "partial results".to_string(),
                stderr: "boom".to_string(),
            },
        };
        assert_eq!(err.step(), Some(PipelineStep::Coverage));
        assert_eq!(err.captured_output(), Some(("partial results", "boom")));
    }

    #[test]
    fn default_layout_uses_the_fixed_relative_paths() {
        let layout = RunLayout::default();
        assert_eq!(layout.staging_dir, PathBuf::from("temp"));
        assert_eq!(layout.output_dir, PathBuf::from("CodeCoverage"));
    }
}
