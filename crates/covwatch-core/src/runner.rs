//! External tool invocation with captured output.

use crate::error::ProcessError;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

/// A fully described external tool invocation.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    /// Logical tool name used in logs and errors.
    pub tool: String,

    /// Executable path.
    pub program: PathBuf,

    /// Arguments, one flag per element (no shell quoting).
    pub args: Vec<String>,
}

/// Captured outcome of a completed tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Logical tool name.
    pub tool: String,

    /// Arguments the tool was invoked with.
    pub args: Vec<String>,

    /// Exit code (0 = success).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,
}

/// Run a tool to completion, capturing stdout and stderr.
///
/// With a timeout set, a tool that outlives it is killed and reported as
/// [`ProcessError::Timeout`]. A non-zero exit becomes
/// [`ProcessError::NonZeroExit`] carrying the captured output.
pub async fn run_tool(
    invocation: &ToolInvocation,
    timeout: Option<Duration>,
) -> Result<ToolOutput, ProcessError> {
    let start = Instant::now();

    debug!(tool = %invocation.tool, program = %invocation.program.display(), "launching tool");

    // kill_on_drop reaps the child when the timeout drops the wait future.
    let child = Command::new(&invocation.program)
        .args(&invocation.args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            tool: invocation.tool.clone(),
            source,
        })?;

    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| ProcessError::Timeout {
                tool: invocation.tool.clone(),
                limit_secs: limit.as_secs(),
            })?,
        None => child.wait_with_output().await,
    }
    .map_err(|source| ProcessError::Wait {
        tool: invocation.tool.clone(),
        source,
    })?;

    let duration_ms = start.elapsed().as_millis() as u64;
    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !output.status.success() {
        return Err(ProcessError::NonZeroExit {
            tool: invocation.tool.clone(),
            exit_code,
            stdout,
            stderr,
        });
    }

    Ok(ToolOutput {
        tool: invocation.tool.clone(),
        args: invocation.args.clone(),
        exit_code,
        stdout,
        stderr,
        duration_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(program: &str, args: &[&str]) -> ToolInvocation {
        ToolInvocation {
            tool: "test_tool".to_string(),
            program: PathBuf::from(program),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn captures_stdout_of_successful_tool() {
        let output = run_tool(&invocation("echo", &["hello"]), None)
            .await
            .expect("echo failed");
        assert_eq!(output.exit_code, 0);
        assert!(output.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn non_zero_exit_is_an_error() {
        let err = run_tool(&invocation("false", &[]), None).await.unwrap_err();
        match err {
            ProcessError::NonZeroExit { exit_code, .. } => assert_ne!(exit_code, 0),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let err = run_tool(&invocation("/does/not/exist", &[]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }

    #[tokio::test]
    async fn slow_tool_times_out() {
        let err = run_tool(&invocation("sleep", &["5"]), Some(Duration::from_secs(1)))
            .await
            .unwrap_err();
        match err {
            ProcessError::Timeout { limit_secs, .. } => assert_eq!(limit_secs, 1),
            other => panic!("unexpected error: {other}"),
        }
    }
}
