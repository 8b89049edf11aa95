//! Solution and project directory classification.
//!
//! A solution directory is recognised by a `.sln` marker file, a project
//! directory by a `.csproj` marker file. Missing or unreadable directories
//! classify as "not one", never as an error.

use std::path::{Path, PathBuf};

const SOLUTION_SUFFIX: &str = ".sln";
const PROJECT_SUFFIX: &str = ".csproj";

/// Whether `dir` exists and contains at least one `.sln` file.
pub fn is_solution_dir(dir: &Path) -> bool {
    has_file_with_suffix(dir, SOLUTION_SUFFIX)
}

/// Whether `dir` exists and contains at least one `.csproj` file.
pub fn is_project_dir(dir: &Path) -> bool {
    has_file_with_suffix(dir, PROJECT_SUFFIX)
}

fn has_file_with_suffix(dir: &Path, suffix: &str) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };

    entries.filter_map(Result::ok).any(|entry| {
        entry.file_type().map(|t| t.is_file()).unwrap_or(false)
            && entry.file_name().to_string_lossy().ends_with(suffix)
    })
}

/// Immediate child directories of `solution_dir` that are project
/// directories. Empty when `solution_dir` is not a solution directory.
/// Order is not significant.
pub fn project_directories(solution_dir: &Path) -> Vec<PathBuf> {
    if !is_solution_dir(solution_dir) {
        return Vec::new();
    }

    let Ok(entries) = std::fs::read_dir(solution_dir) else {
        return Vec::new();
    };

    entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir() && is_project_dir(path))
        .collect()
}

/// Heuristic used to preselect watched projects: the directory name
/// contains "test" in any casing.
pub fn looks_like_test_project(dir: &Path) -> bool {
    dir.file_name()
        .map(|name| name.to_string_lossy().to_lowercase().contains("test"))
        .unwrap_or(false)
}
