//! Asset path resolution.
//!
//! [`resolve_asset_path`] turns an untrusted, caller-supplied relative path
//! into a canonical asset identity under a base directory. Resolution is a
//! fixed sequence of named phases; the order matters:
//!
//! 1. [`reject_unsafe_input`] on the raw string (before any normalization,
//!    so encodings that would later collapse into `..` never get that far)
//! 2. [`normalize_separators`]
//! 3. [`strip_base_prefix`] (tolerates callers that include the root name)
//! 4. [`require_file_path`]
//! 5. [`reject_unsafe_input`] and [`validate_windows_path`] on the result
//! 6. [`validate_path_within_base`] (symlink-aware boundary check)

mod base;
mod windows;

use std::path::{Path, PathBuf};

use tracing::warn;

pub use base::validate_path_within_base;
pub use windows::{WINDOWS_RESERVED_NAMES, validate_windows_path};

use crate::security::error::PathTraversalError;

/// A successfully resolved asset path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    absolute: PathBuf,
    relative: String,
}

impl ResolvedPath {
    /// Canonical absolute filesystem location (symlinks resolved).
    #[must_use]
    pub fn absolute(&self) -> &Path {
        &self.absolute
    }

    /// Canonical relative path, `/`-separated, e.g. `2025/10/31/photo.webp`.
    ///
    /// This is the asset's identity for metadata keys and cache keys.
    #[must_use]
    pub fn relative(&self) -> &str {
        &self.relative
    }

    /// Final path segment of the canonical relative path.
    #[must_use]
    pub fn filename(&self) -> &str {
        self.relative
            .rsplit('/')
            .next()
            .unwrap_or(self.relative.as_str())
    }

    /// Consumes the resolution, returning the absolute path.
    #[must_use]
    pub fn into_absolute(self) -> PathBuf {
        self.absolute
    }
}

/// Resolve an untrusted relative asset path against `base_dir`.
///
/// `base_dir` must exist. The result is guaranteed to be a strict
/// descendant of the canonicalized base directory.
///
/// # Errors
///
/// Returns [`PathTraversalError`] when any phase rejects the input. Inputs
/// with a `..` segment or a leading separator are always rejected, never
/// sanitized into something acceptable.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use asset_pipeline::security::resolve_asset_path;
///
/// let base = Path::new("optimized");
/// let a = resolve_asset_path("optimized/2025/10/31/a.webp", base)?;
/// let b = resolve_asset_path("2025\\10\\31\\a.webp", base)?;
/// assert_eq!(a, b);
/// assert!(resolve_asset_path("../secrets.txt", base).is_err());
/// # Ok::<(), asset_pipeline::security::PathTraversalError>(())
/// ```
pub fn resolve_asset_path(raw: &str, base_dir: &Path) -> Result<ResolvedPath, PathTraversalError> {
    reject_unsafe_input(raw)?;
    let normalized = normalize_separators(raw);
    let stripped = strip_base_prefix(&normalized, base_dir);
    let relative = require_file_path(stripped, base_dir)?;

    reject_unsafe_input(relative)?;
    validate_windows_path(relative)?;

    let absolute = validate_path_within_base(base_dir, Path::new(relative)).inspect_err(|e| {
        warn!(
            security_event = "path_traversal_attempt",
            path = %raw,
            reason = %e,
            "Blocked path failing base directory boundary check"
        );
    })?;

    Ok(ResolvedPath {
        absolute,
        relative: relative.to_string(),
    })
}

/// Phase 1/5: string-level rejection of traversal and absolute paths.
///
/// Rejects empty input, null bytes, any `..` segment (split on both `/` and
/// `\`), a leading separator, and a Windows drive prefix such as `C:`.
///
/// # Errors
///
/// Returns the matching [`PathTraversalError`] variant.
pub fn reject_unsafe_input(raw: &str) -> Result<(), PathTraversalError> {
    if raw.trim().is_empty() {
        return Err(PathTraversalError::EmptyPath);
    }

    if raw.contains('\0') {
        warn!(
            security_event = "path_traversal_attempt",
            path = %raw.replace('\0', "\\0"),
            reason = "null_byte",
            "Blocked path with null byte"
        );
        return Err(PathTraversalError::NullByte);
    }

    if raw.split(['/', '\\']).any(|segment| segment == "..") {
        warn!(
            security_event = "path_traversal_attempt",
            path = %raw,
            reason = "parent_segment",
            "Blocked path with '..' segment"
        );
        return Err(PathTraversalError::EscapesBaseDirectory);
    }

    let bytes = raw.as_bytes();
    let drive_prefix = bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';
    if raw.starts_with(['/', '\\']) || drive_prefix {
        warn!(
            security_event = "path_traversal_attempt",
            path = %raw,
            reason = "absolute_path",
            "Blocked absolute path"
        );
        return Err(PathTraversalError::AbsolutePath);
    }

    Ok(())
}

/// Phase 2: convert `\` to `/` and drop empty and `.` segments.
#[must_use]
pub fn normalize_separators(raw: &str) -> String {
    raw.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Phase 3: strip one leading segment naming the base directory.
///
/// The comparison is case-insensitive and only applies when the base name is
/// followed by a separator, so `optimizedX/a.webp` is left untouched.
#[must_use]
pub fn strip_base_prefix<'a>(normalized: &'a str, base_dir: &Path) -> &'a str {
    let Some(base_name) = base_name(base_dir) else {
        return normalized;
    };

    match normalized.split_once('/') {
        Some((first, rest)) if first.eq_ignore_ascii_case(&base_name) => rest,
        _ => normalized,
    }
}

/// Phase 4: the path must name something inside the base, not the base.
///
/// # Errors
///
/// Returns [`PathTraversalError::MissingFilePath`] for an empty result or a
/// bare reference to the base directory.
pub fn require_file_path<'a>(
    stripped: &'a str,
    base_dir: &Path,
) -> Result<&'a str, PathTraversalError> {
    if stripped.is_empty() {
        return Err(PathTraversalError::MissingFilePath);
    }

    if base_name(base_dir).is_some_and(|name| stripped.eq_ignore_ascii_case(&name)) {
        return Err(PathTraversalError::MissingFilePath);
    }

    Ok(stripped)
}

fn base_name(base_dir: &Path) -> Option<String> {
    base_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_base() -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("optimized");
        fs::create_dir_all(base.join("2025/10/31")).unwrap();
        fs::write(base.join("2025/10/31/a.jpg"), b"jpg").unwrap();
        (tmp, base)
    }

    #[test]
    fn test_prefixed_and_bare_paths_resolve_identically() {
        let (_tmp, base) = create_base();

        let prefixed = resolve_asset_path("optimized/2025/10/31/a.jpg", &base).unwrap();
        let bare = resolve_asset_path("2025/10/31/a.jpg", &base).unwrap();
        let windows = resolve_asset_path("Optimized\\2025\\10\\31\\a.jpg", &base).unwrap();

        assert_eq!(prefixed, bare);
        assert_eq!(bare, windows);
        assert_eq!(bare.relative(), "2025/10/31/a.jpg");
        assert_eq!(bare.filename(), "a.jpg");
        assert!(bare.absolute().starts_with(base.canonicalize().unwrap()));
    }

    #[test]
    fn test_bare_base_reference_rejected() {
        let (_tmp, base) = create_base();

        assert_eq!(
            resolve_asset_path("optimized", &base),
            Err(PathTraversalError::MissingFilePath)
        );
        assert_eq!(
            resolve_asset_path("optimized/", &base),
            Err(PathTraversalError::MissingFilePath)
        );
        assert_eq!(
            resolve_asset_path("OPTIMIZED\\", &base),
            Err(PathTraversalError::MissingFilePath)
        );
    }

    #[test]
    fn test_similar_prefix_not_stripped() {
        let (_tmp, base) = create_base();

        let resolved = resolve_asset_path("optimizedX/2025/a.jpg", &base).unwrap();
        assert_eq!(resolved.relative(), "optimizedX/2025/a.jpg");
    }

    #[test]
    fn test_traversal_rejected_in_any_position() {
        let (_tmp, base) = create_base();

        let attack_paths = [
            "../etc/passwd",
            "2025/../../etc/passwd",
            "optimized/../secrets",
            "2025\\..\\..\\boot.ini",
            "2025/10/31/..",
        ];

        for path in &attack_paths {
            assert_eq!(
                resolve_asset_path(path, &base),
                Err(PathTraversalError::EscapesBaseDirectory),
                "traversal not prevented for: {path}"
            );
        }
    }

    #[test]
    fn test_absolute_paths_rejected() {
        let (_tmp, base) = create_base();

        for path in ["/etc/passwd", "\\windows\\system32", "C:/photo.jpg", "c:\\a.jpg"] {
            assert_eq!(
                resolve_asset_path(path, &base),
                Err(PathTraversalError::AbsolutePath),
                "absolute path accepted: {path}"
            );
        }
    }

    #[test]
    fn test_empty_and_null_rejected() {
        let (_tmp, base) = create_base();

        assert_eq!(resolve_asset_path("", &base), Err(PathTraversalError::EmptyPath));
        assert_eq!(resolve_asset_path("  ", &base), Err(PathTraversalError::EmptyPath));
        assert_eq!(
            resolve_asset_path("a\0.jpg", &base),
            Err(PathTraversalError::NullByte)
        );
    }

    #[test]
    fn test_dot_segments_are_dropped() {
        let (_tmp, base) = create_base();

        let resolved = resolve_asset_path("./2025//10/./31/a.jpg", &base).unwrap();
        assert_eq!(resolved.relative(), "2025/10/31/a.jpg");
    }

    #[test]
    fn test_double_dots_inside_names_allowed() {
        let (_tmp, base) = create_base();

        let resolved = resolve_asset_path("2025/10/31/a..b.jpg", &base).unwrap();
        assert_eq!(resolved.filename(), "a..b.jpg");
    }

    #[test]
    fn test_strip_base_prefix_only_once() {
        let base = Path::new("/srv/optimized");
        assert_eq!(
            strip_base_prefix("optimized/optimized/a.jpg", base),
            "optimized/a.jpg"
        );
        assert_eq!(strip_base_prefix("optimized", base), "optimized");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_rejected_after_string_checks_pass() {
        use std::os::unix::fs::symlink;

        let (tmp, base) = create_base();
        let outside = tmp.path().join("outside");
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("secret.jpg"), b"secret").unwrap();
        symlink(&outside, base.join("escape")).unwrap();

        assert_eq!(
            resolve_asset_path("escape/secret.jpg", &base),
            Err(PathTraversalError::EscapesBaseDirectory)
        );
    }
}
