//! Build output directory resolution.
//!
//! Maps each project directory to its `bin/<config>` compiled-output
//! directory. Resolution is all-or-nothing: a single project with the wrong
//! shape fails the whole call.

use crate::error::StructureError;
use crate::solution::is_project_dir;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Resolve the compiled-output directory for each project directory.
///
/// Entries that are not project directories are silently skipped. Each kept
/// project must contain a `bin` directory holding a `<build_config>`
/// directory, otherwise a [`StructureError`] names the offending project
/// and no mapping is returned.
///
/// Keys are project directory names, values the `bin/<config>` paths.
pub fn resolve_output_dirs(
    project_dirs: &[PathBuf],
    build_config: &str,
) -> Result<BTreeMap<String, PathBuf>, StructureError> {
    let mut resolved = BTreeMap::new();

    for dir in project_dirs {
        if !is_project_dir(dir) {
            continue;
        }

        let project = dir_name(dir);

        let bin = dir.join("bin");
        if !bin.is_dir() {
            return Err(StructureError::MissingBin { project });
        }

        let config_dir = bin.join(build_config);
        if !config_dir.is_dir() {
            return Err(StructureError::MissingBuildConfig {
                project,
                config: build_config.to_string(),
            });
        }

        resolved.insert(project, config_dir);
    }

    Ok(resolved)
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn make_project(root: &Path, name: &str) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{name}.csproj")), "").unwrap();
        dir
    }

    #[test]
    fn resolves_bin_config_directory_per_project() {
        let tmp = TempDir::new().unwrap();
        let proj = make_project(tmp.path(), "App.Test");
        fs::create_dir_all(proj.join("bin/Local")).unwrap();

        let resolved = resolve_output_dirs(&[proj.clone()], "Local").unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved["App.Test"], proj.join("bin/Local"));
    }

    #[test]
    fn non_project_directories_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let not_a_project = tmp.path().join("packages");
        fs::create_dir(&not_a_project).unwrap();

        let resolved = resolve_output_dirs(&[not_a_project], "Local").unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn missing_bin_names_the_project() {
        let tmp = TempDir::new().unwrap();
        let proj = make_project(tmp.path(), "App.Test");

        let err = resolve_output_dirs(&[proj], "Local").unwrap_err();
        assert_eq!(
            err,
            StructureError::MissingBin {
                project: "App.Test".to_string()
            }
        );
    }

    #[test]
    fn missing_config_names_project_and_config() {
        let tmp = TempDir::new().unwrap();
        let proj = make_project(tmp.path(), "App.Test");
        fs::create_dir_all(proj.join("bin/Debug")).unwrap();

        let err = resolve_output_dirs(&[proj], "Local").unwrap_err();
        assert_eq!(
            err,
            StructureError::MissingBuildConfig {
                project: "App.Test".to_string(),
                config: "Local".to_string()
            }
        );
    }

    #[test]
    fn resolution_is_all_or_nothing() {
        let tmp = TempDir::new().unwrap();
        let good = make_project(tmp.path(), "Good.Test");
        fs::create_dir_all(good.join("bin/Local")).unwrap();
        let bad = make_project(tmp.path(), "Bad.Test");

        let err = resolve_output_dirs(&[good, bad], "Local").unwrap_err();
        assert_eq!(
            err,
            StructureError::MissingBin {
                project: "Bad.Test".to_string()
            }
        );
    }
}
