//! Error types for the covwatch engine.

use std::path::PathBuf;

/// Errors raised while loading or validating tool settings.
///
/// All of these are fatal at startup: the system refuses to enter the
/// watch-active state on any of them.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read settings file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings file {path} is not valid: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{tool} executable could not be found at {path}")]
    ExecutableMissing { tool: &'static str, path: PathBuf },
}

/// A project directory does not have the expected `bin/<config>` shape.
///
/// Resolution is all-or-nothing: the first structural failure aborts the
/// whole call and no partial mapping is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructureError {
    #[error("could not find 'bin' folder in project {project}")]
    MissingBin { project: String },

    #[error("could not find '{config}' build config folder in project {project}")]
    MissingBuildConfig { project: String, config: String },
}

/// An external tool invocation failed.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to launch {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to collect output from {tool}: {source}")]
    Wait {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} timed out after {limit_secs}s")]
    Timeout { tool: String, limit_secs: u64 },

    #[error("{tool} exited with code {exit_code}")]
    NonZeroExit {
        tool: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },
}

/// Filesystem watch setup failures.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("failed to create filesystem watcher: {0}")]
    Create(#[source] notify::Error),

    #[error("failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}
