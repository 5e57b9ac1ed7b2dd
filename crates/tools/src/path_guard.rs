//! Path validation: confines file tools to the workspace directory.
//!
//! Relative paths resolve against the workspace root. Absolute paths are
//! accepted only when they already point inside it. Forbidden prefixes
//! (e.g., ~/.ssh, /etc) are rejected even inside the workspace.

use std::path::{Component, Path, PathBuf};

/// Error returned when path validation fails.
#[derive(Debug, thiserror::Error)]
pub enum PathGuardError {
    #[error("Path '{path}' is outside the workspace")]
    OutsideWorkspace { path: String },

    #[error("Path '{path}' matches forbidden pattern '{pattern}'")]
    ForbiddenPath { path: String, pattern: String },

    #[error("Path traversal detected in '{path}'")]
    PathTraversal { path: String },

    #[error("Failed to canonicalize path '{path}': {reason}")]
    CanonicalizeFailed { path: String, reason: String },
}

/// Resolve `path` against `workspace`, rejecting anything that escapes it.
///
/// Checks:
/// 1. No `..` components
/// 2. Absolute paths must sit under the workspace
/// 3. The deepest existing ancestor, once symlinks resolve, is still inside
/// 4. No forbidden prefix matches
pub fn resolve_in_workspace(
    workspace: &Path,
    path: &str,
    forbidden_paths: &[String],
) -> Result<PathBuf, PathGuardError> {
    let normalized = path.replace('\\', "/");
    let input = Path::new(&normalized);

    if input.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(PathGuardError::PathTraversal { path: path.into() });
    }

    let joined = if input.is_absolute() {
        if !input.starts_with(workspace) {
            return Err(PathGuardError::OutsideWorkspace { path: path.into() });
        }
        input.to_path_buf()
    } else {
        workspace.join(input)
    };

    // Symlinks inside the workspace must not lead back out of it.
    if workspace.exists() {
        let root = canonicalize(workspace, path)?;
        let mut existing = joined.as_path();
        while !existing.exists() {
            match existing.parent() {
                Some(parent) => existing = parent,
                None => break,
            }
        }
        if existing.exists() && !canonicalize(existing, path)?.starts_with(&root) {
            return Err(PathGuardError::OutsideWorkspace { path: path.into() });
        }
    }

    let lowered = joined.to_string_lossy().replace('\\', "/").to_lowercase();
    for forbidden in forbidden_paths {
        let pattern = expand_tilde(forbidden).replace('\\', "/").to_lowercase();
        if lowered.starts_with(&pattern) {
            return Err(PathGuardError::ForbiddenPath {
                path: path.into(),
                pattern: forbidden.clone(),
            });
        }
    }

    Ok(joined)
}

fn canonicalize(p: &Path, original: &str) -> Result<PathBuf, PathGuardError> {
    p.canonicalize()
        .map_err(|e| PathGuardError::CanonicalizeFailed {
            path: original.into(),
            reason: e.to_string(),
        })
}

/// Expand ~ to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if (path.starts_with("~/") || path == "~")
        && let Some(home) = home_dir()
    {
        return path.replacen('~', &home, 1);
    }
    path.to_string()
}

fn home_dir() -> Option<String> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE").ok()
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME").ok()
    }
}
