//! Error types for path and filename validation.
//!
//! These errors describe the specific rule an untrusted path or filename
//! violated. They are mapped onto the crate-level [`crate::Error`] kinds
//! (`PathTraversal`, `EmptyPath`, `InvalidRequest`) at the pipeline boundary.

use std::error::Error;
use std::fmt;

/// Error type for rejected asset paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathTraversalError {
    /// Path contains null bytes.
    NullByte,
    /// Path is empty.
    EmptyPath,
    /// Path names the base directory itself instead of an asset inside it.
    MissingFilePath,
    /// Path is absolute (leading separator or drive letter).
    AbsolutePath,
    /// Path contains a `..` segment or resolves outside the base directory.
    EscapesBaseDirectory,
    /// Path contains a reserved Windows device name (CON, PRN, NUL, etc.).
    ReservedWindowsName,
    /// Path is a Windows UNC path (\\server\share).
    UncPath,
    /// Path contains Windows alternate data stream syntax (`file:stream`).
    AlternateDataStream,
    /// The base directory itself could not be resolved.
    BaseUnavailable,
}

impl PathTraversalError {
    /// Returns true for the "nothing usable was supplied" family of errors.
    #[must_use]
    pub fn is_empty_path(&self) -> bool {
        matches!(self, Self::EmptyPath | Self::MissingFilePath)
    }
}

impl fmt::Display for PathTraversalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullByte => write!(f, "Path contains null bytes"),
            Self::EmptyPath => write!(f, "Path is empty"),
            Self::MissingFilePath => write!(f, "Path must include file path"),
            Self::AbsolutePath => write!(f, "Absolute paths are not allowed"),
            Self::EscapesBaseDirectory => {
                write!(f, "Path attempts to escape base directory")
            },
            Self::ReservedWindowsName => {
                write!(f, "Path contains reserved Windows device name")
            },
            Self::UncPath => write!(f, "UNC paths are not allowed"),
            Self::AlternateDataStream => {
                write!(f, "Alternate data streams are not allowed")
            },
            Self::BaseUnavailable => write!(f, "Base directory cannot be resolved"),
        }
    }
}

impl Error for PathTraversalError {}

/// Error type for invalid single-segment filenames (rename targets, archives).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilenameError {
    /// Filename is empty.
    EmptyName,
    /// Filename contains null bytes.
    NullByte,
    /// Filename contains path separators.
    PathSeparator,
    /// Filename is a special directory (`.` or `..`).
    SpecialDirectory,
    /// Filename is too long (> 255 characters).
    TooLong,
    /// Filename contains control characters.
    ControlCharacter,
}

impl fmt::Display for FilenameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Filename is empty"),
            Self::NullByte => write!(f, "Filename contains null bytes"),
            Self::PathSeparator => write!(f, "Filename contains path separators"),
            Self::SpecialDirectory => write!(f, "Filename cannot be '.' or '..'"),
            Self::TooLong => write!(f, "Filename is too long (max 255 characters)"),
            Self::ControlCharacter => write!(f, "Filename contains control characters"),
        }
    }
}

impl Error for FilenameError {}
