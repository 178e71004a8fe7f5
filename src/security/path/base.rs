//! Base directory boundary check with symlink protection.
//!
//! String-level checks cannot see through symlinks: a link inside the
//! derivative root may point anywhere on disk. This check canonicalizes the
//! joined path (resolving every symlink) and verifies the result is still a
//! strict descendant of the canonicalized base directory.
//!
//! # Platform Differences
//!
//! - **Unix**: Both file and directory symlinks use the same mechanism
//! - **Windows**: File symlinks (`symlink_file`) and directory symlinks
//!   (`symlink_dir`) are distinct and usually need elevated privileges

use std::path::{Path, PathBuf};

use crate::security::error::PathTraversalError;

/// Validate that a path stays within a base directory after canonicalization.
///
/// # Arguments
/// * `base_dir` - The base directory (must exist; it is canonicalized)
/// * `file_path` - The path to validate (relative to `base_dir`)
///
/// # Returns
/// * `Ok(canonical_path)` - The canonical absolute path, strictly inside `base_dir`
/// * `Err(PathTraversalError::EscapesBaseDirectory)` - If the path escapes or
///   names the base itself
/// * `Err(PathTraversalError::BaseUnavailable)` - If `base_dir` cannot be resolved
///
/// For paths that do not exist yet, the nearest existing ancestor is
/// canonicalized and the remaining components are appended unchanged.
pub fn validate_path_within_base(
    base_dir: &Path,
    file_path: &Path,
) -> Result<PathBuf, PathTraversalError> {
    let canonical_base = base_dir
        .canonicalize()
        .map_err(|_| PathTraversalError::BaseUnavailable)?;

    let full_path = base_dir.join(file_path);
    let canonical = canonicalize_existing_prefix(&full_path)?;

    if !canonical.starts_with(&canonical_base) || canonical == canonical_base {
        return Err(PathTraversalError::EscapesBaseDirectory);
    }

    Ok(canonical)
}

/// Canonicalize the deepest existing ancestor of `path` and re-append the rest.
fn canonicalize_existing_prefix(path: &Path) -> Result<PathBuf, PathTraversalError> {
    let mut existing = path;
    let mut missing = Vec::new();

    // symlink_metadata so a dangling link counts as existing and fails canonicalize
    while std::fs::symlink_metadata(existing).is_err() {
        let name = existing.file_name().ok_or(PathTraversalError::EmptyPath)?;
        missing.push(name.to_os_string());
        existing = existing.parent().ok_or(PathTraversalError::EmptyPath)?;
    }

    let mut canonical = existing
        .canonicalize()
        .map_err(|_| PathTraversalError::EscapesBaseDirectory)?;
    for name in missing.into_iter().rev() {
        canonical.push(name);
    }

    Ok(canonical)
}
