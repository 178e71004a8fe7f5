//! Checks for asset paths that would misbehave on a Windows host.
//!
//! Derivative trees get synced to Windows machines, so these run on every
//! platform. The resolver calls [`validate_windows_path`] after its
//! traversal checks, which means drive letters never reach this module.

use tracing::warn;

use crate::security::error::PathTraversalError;

/// Device names Windows reserves in any directory, with or without an
/// extension (`nul.webp` still opens the null device).
pub const WINDOWS_RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Rejects a relative asset path that Windows would not open as a plain file.
///
/// # Errors
///
/// * [`PathTraversalError::UncPath`] - starts with `\\` or `//`
/// * [`PathTraversalError::AlternateDataStream`] - contains `:`
/// * [`PathTraversalError::ReservedWindowsName`] - a segment is a device name
///
/// # Examples
///
/// ```
/// use asset_pipeline::security::validate_windows_path;
///
/// assert!(validate_windows_path("2025/10/31/photo.webp").is_ok());
/// assert!(validate_windows_path("2025/CON.webp").is_err());
/// assert!(validate_windows_path("\\\\nas\\assets").is_err());
/// assert!(validate_windows_path("photo.webp:hidden").is_err());
/// ```
pub fn validate_windows_path(path: &str) -> Result<(), PathTraversalError> {
    let Some((error, reason, segment)) = windows_hazard(path) else {
        return Ok(());
    };

    warn!(
        security_event = "windows_path_attack",
        path = %path,
        segment = segment.unwrap_or_default(),
        reason,
        "Blocked asset path unsafe on Windows"
    );
    Err(error)
}

fn windows_hazard(path: &str) -> Option<(PathTraversalError, &'static str, Option<&str>)> {
    if path.starts_with("\\\\") || path.starts_with("//") {
        return Some((PathTraversalError::UncPath, "unc_path", None));
    }
    if path.contains(':') {
        return Some((PathTraversalError::AlternateDataStream, "alternate_data_stream", None));
    }

    path.split(['/', '\\'])
        .find(|segment| is_reserved_device(segment))
        .map(|segment| (PathTraversalError::ReservedWindowsName, "reserved_device_name", Some(segment)))
}

/// Trailing spaces before the extension are ignored, as Windows does (`Nul .jpg`).
fn is_reserved_device(segment: &str) -> bool {
    let stem = segment.split('.').next().unwrap_or(segment).trim_end_matches(' ');
    !stem.is_empty()
        && WINDOWS_RESERVED_NAMES
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(stem))
}
