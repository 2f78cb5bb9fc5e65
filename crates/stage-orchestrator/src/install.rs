//! Executable resolution from an install root
//!
//! When the configuration gives no explicit executable path, the required
//! tool version is read from the work directory's version marker and a
//! matching binary is searched for under the configured install root, the
//! way version-managed tool installs lay themselves out: one directory per
//! version, with the binary at a small set of conventional relative paths.

use std::path::{Path, PathBuf};

use stage_core::LaunchError;

/// Version marker file inside the work directory
const VERSION_MARKER: &str = "ProjectSettings/ProjectVersion.txt";

/// Relative locations a versioned install keeps its binary at
const CANDIDATE_PATHS: &[&str] = &[
    "Editor/app-editor",
    "Editor/app-editor.exe",
    "app-editor",
    "app-editor.exe",
];

/// Read the tool version required by a work directory.
///
/// The marker file holds `key: value` lines; the first line's value is the
/// version string.
pub fn read_required_version(work_directory: &Path) -> Result<String, LaunchError> {
    let marker = work_directory.join(VERSION_MARKER);
    let content = std::fs::read_to_string(&marker)
        .map_err(|_| LaunchError::VersionUnknown(work_directory.to_path_buf()))?;

    let version = content
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(_, value)| value.trim())
        .find(|value| !value.is_empty())
        .ok_or_else(|| LaunchError::VersionUnknown(work_directory.to_path_buf()))?;

    Ok(version.to_string())
}

/// Find the binary for a given version under an install root.
///
/// The root contains one directory per installed version; the binary sits at
/// one of a few conventional relative paths inside it.
pub fn find_versioned_executable(
    install_root: &Path,
    version: &str,
) -> Result<PathBuf, LaunchError> {
    let install = install_root.join(version);
    for relative in CANDIDATE_PATHS {
        let candidate = install.join(relative);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    Err(LaunchError::VersionNotInstalled {
        version: version.to_string(),
    })
}

/// Search an ordered list of install roots, first hit wins
pub fn find_in_roots(roots: &[PathBuf], version: &str) -> Result<PathBuf, LaunchError> {
    for root in roots {
        if let Ok(found) = find_versioned_executable(root, version) {
            return Ok(found);
        }
    }

    Err(LaunchError::VersionNotInstalled {
        version: version.to_string(),
    })
}

/// Conventional per-platform install roots, searched after any configured one
fn default_install_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Some(home) = std::env::var_os("HOME") {
        roots.push(PathBuf::from(home).join(".local/share/app-editor/editors"));
    }
    if cfg!(target_os = "linux") {
        roots.push(PathBuf::from("/opt/app-editor/editors"));
    }
    if cfg!(target_os = "macos") {
        roots.push(PathBuf::from("/Applications/AppEditor"));
    }
    if cfg!(windows) {
        if let Some(programs) = std::env::var_os("ProgramFiles") {
            roots.push(PathBuf::from(programs).join("AppEditor").join("Editors"));
        }
    }
    roots
}

/// Resolve the executable to launch for a work directory.
///
/// An explicit path wins; otherwise the work directory's version marker is
/// read and the configured install root plus the conventional per-platform
/// locations are searched for that version.
pub fn resolve_executable(
    explicit: Option<&Path>,
    install_root: Option<&Path>,
    work_directory: &Path,
) -> Result<PathBuf, LaunchError> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(LaunchError::ExecutableNotFound(path.to_path_buf()));
    }

    let version = read_required_version(work_directory)?;

    let mut roots = Vec::new();
    if let Some(root) = install_root {
        roots.push(root.to_path_buf());
    }
    roots.extend(default_install_roots());
    tracing::debug!(%version, roots = roots.len(), "Resolving versioned executable");

    find_in_roots(&roots, &version)
}
