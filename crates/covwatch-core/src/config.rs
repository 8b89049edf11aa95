//! Tool settings loaded once at startup.
//!
//! The settings file is TOML with three required executable paths:
//!
//! ```toml
//! test_runner = "/opt/nunit/nunit-console.exe"
//! coverage_tool = "/opt/opencover/OpenCover.Console.exe"
//! report_generator = "/opt/reportgen/ReportGenerator.exe"
//! timeout_secs = 600   # optional, 0 disables the timeout
//! ```
//!
//! Every executable path must resolve to an existing file, otherwise the
//! system refuses to start.

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Paths to the required external tools plus run hardening knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolSettings {
    /// Test runner executable wrapped by the coverage tool.
    pub test_runner: PathBuf,

    /// Coverage instrumentation executable.
    pub coverage_tool: PathBuf,

    /// Report generator executable.
    pub report_generator: PathBuf,

    /// Per-invocation timeout in seconds; 0 lets a tool run unbounded.
    #[serde(default)]
    pub timeout_secs: u64,
}

impl ToolSettings {
    /// Load settings from a TOML file and validate the executables.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let settings: ToolSettings =
            toml::from_str(&raw).map_err(|source| ConfigError::Invalid {
                path: path.to_path_buf(),
                source,
            })?;

        settings.validate()?;
        Ok(settings)
    }

    /// Check that each configured executable exists.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (tool, path) in self.executables() {
            if !path.is_file() {
                return Err(ConfigError::ExecutableMissing {
                    tool,
                    path: path.clone(),
                });
            }
        }
        Ok(())
    }

    /// Tool timeout, `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    fn executables(&self) -> [(&'static str, &PathBuf); 3] {
        [
            ("test_runner", &self.test_runner),
            ("coverage_tool", &self.coverage_tool),
            ("report_generator", &self.report_generator),
        ]
    }
}
