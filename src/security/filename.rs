//! Single-segment filename validation.
//!
//! Used for rename targets and archived original names, where the caller
//! supplies a bare filename that must never carry directory structure.

use tracing::warn;

use super::error::FilenameError;
use crate::constants::MAX_FILENAME_LEN;

/// Validate a filename supplied by an untrusted caller.
///
/// Valid filenames:
/// - Must not be empty (after trimming surrounding whitespace)
/// - Must not contain path separators (`/`, `\`)
/// - Must not contain null bytes or control characters
/// - Must not be `.` or `..`
/// - Must be at most 255 bytes
///
/// Returns the trimmed filename.
///
/// # Errors
///
/// Returns [`FilenameError`] describing the first rule the name violates.
///
/// # Examples
///
/// ```
/// use asset_pipeline::security::sanitize_filename;
///
/// assert_eq!(sanitize_filename(" sunset.webp ").unwrap(), "sunset.webp");
/// assert!(sanitize_filename("../etc/passwd").is_err());
/// assert!(sanitize_filename("..").is_err());
/// ```
pub fn sanitize_filename(name: &str) -> Result<String, FilenameError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(FilenameError::EmptyName);
    }

    if name.contains('\0') {
        warn!(
            security_event = "filename_injection_attempt",
            filename = %name.replace('\0', "\\0"),
            reason = "null_byte",
            "Blocked filename with null byte"
        );
        return Err(FilenameError::NullByte);
    }

    if name.contains('/') || name.contains('\\') {
        warn!(
            security_event = "filename_injection_attempt",
            filename = %name,
            reason = "path_separator",
            "Blocked filename with path separator"
        );
        return Err(FilenameError::PathSeparator);
    }

    if name == "." || name == ".." {
        warn!(
            security_event = "filename_injection_attempt",
            filename = %name,
            reason = "special_directory",
            "Blocked special directory as filename"
        );
        return Err(FilenameError::SpecialDirectory);
    }

    if name.len() > MAX_FILENAME_LEN {
        warn!(
            security_event = "filename_injection_attempt",
            filename_len = name.len(),
            reason = "too_long",
            "Blocked excessively long filename"
        );
        return Err(FilenameError::TooLong);
    }

    if name.chars().any(char::is_control) {
        warn!(
            security_event = "filename_injection_attempt",
            filename = %name.chars().filter(|c| !c.is_control()).collect::<String>(),
            reason = "control_character",
            "Blocked filename with control characters"
        );
        return Err(FilenameError::ControlCharacter);
    }

    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename_valid() {
        assert_eq!(sanitize_filename("photo.webp").unwrap(), "photo.webp");
        assert_eq!(sanitize_filename("my photo 2.jpg").unwrap(), "my photo 2.jpg");
        assert_eq!(sanitize_filename("  padded.png\t").unwrap(), "padded.png");
    }

    #[test]
    fn test_sanitize_filename_path_separator() {
        assert_eq!(
            sanitize_filename("2025/photo.webp"),
            Err(FilenameError::PathSeparator)
        );
        assert_eq!(
            sanitize_filename("..\\..\\evil.webp"),
            Err(FilenameError::PathSeparator)
        );
    }

    #[test]
    fn test_sanitize_filename_special_directory() {
        assert_eq!(sanitize_filename(".."), Err(FilenameError::SpecialDirectory));
        assert_eq!(sanitize_filename("."), Err(FilenameError::SpecialDirectory));
    }

    #[test]
    fn test_sanitize_filename_empty_and_control() {
        assert_eq!(sanitize_filename(""), Err(FilenameError::EmptyName));
        assert_eq!(sanitize_filename("   "), Err(FilenameError::EmptyName));
        assert_eq!(sanitize_filename("a\0b"), Err(FilenameError::NullByte));
        assert_eq!(
            sanitize_filename("a\u{7}b.png"),
            Err(FilenameError::ControlCharacter)
        );
    }

    #[test]
    fn test_sanitize_filename_too_long() {
        let long = format!("{}.webp", "a".repeat(300));
        assert_eq!(sanitize_filename(&long), Err(FilenameError::TooLong));
    }
}
