//! Pipeline error types for typed error handling.
//!
//! Every fallible pipeline operation returns [`Error`]. Validation and path
//! errors are reported to the caller with a specific kind; internal errors
//! are logged in full and surfaced as a generic message outside dev mode
//! (see [`Error::public_message`]).

use std::path::PathBuf;

use crate::security::{FilenameError, PathTraversalError};

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Unsafe or invalid input path. Always rejected, never sanitized.
    #[error("invalid path '{path}': {reason}")]
    PathTraversal {
        path: String,
        reason: PathTraversalError,
    },

    /// Path did not name an asset (empty, or the root directory itself).
    #[error("invalid path '{path}': {reason}")]
    EmptyPath {
        path: String,
        reason: PathTraversalError,
    },

    /// Asset or metadata absent.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// Rename target already exists.
    #[error("already exists: {path}")]
    AlreadyExists { path: String },

    /// Upload has an extension or content type outside the supported set.
    #[error("unsupported file type for '{filename}'")]
    UnsupportedType { filename: String },

    /// Upload exceeds the configured size limit.
    #[error("'{filename}' is {size} bytes, exceeding the {max} byte limit")]
    TooLarge {
        filename: String,
        size: u64,
        max: u64,
    },

    /// Codec error while transcoding a specific file.
    #[error("failed to transcode '{filename}': {reason}")]
    TranscodeFailure { filename: String, reason: String },

    /// Codec error while generating a thumbnail (source exists).
    #[error("failed to generate thumbnail for '{path}': {reason}")]
    ThumbnailFailure { path: String, reason: String },

    /// Technical metadata could not be read. Non-fatal inside the store.
    #[error("failed to extract image metadata from {path:?}: {reason}")]
    ExtractionFailure { path: PathBuf, reason: String },

    /// Request is well-formed but semantically invalid.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// IO error with context.
    #[error("IO error in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Metadata (de)serialization error with context.
    #[error("JSON error in {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unexpected internal failure (task join errors and the like).
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a JSON error with context.
    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    /// Create a not found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create an already exists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists { path: path.into() }
    }

    /// Create a transcode failure error.
    pub fn transcode(filename: impl Into<String>, reason: impl ToString) -> Self {
        Self::TranscodeFailure {
            filename: filename.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a thumbnail failure error.
    pub fn thumbnail(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::ThumbnailFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an extraction failure error.
    pub fn extraction(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ExtractionFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Map a path resolution failure onto the matching error kind.
    pub fn from_path(path: impl Into<String>, reason: PathTraversalError) -> Self {
        let path = path.into();
        if reason.is_empty_path() {
            Self::EmptyPath { path, reason }
        } else {
            Self::PathTraversal { path, reason }
        }
    }

    /// Map a filename validation failure onto an invalid request.
    pub fn from_filename(name: &str, reason: &FilenameError) -> Self {
        Self::InvalidRequest(format!("invalid filename '{name}': {reason}"))
    }

    /// Create an internal error from a blocking task join failure.
    pub fn join(err: &tokio::task::JoinError) -> Self {
        Self::Internal(format!("task join error: {err}"))
    }
}

impl Error {
    /// Get the appropriate HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::PathTraversal { .. } | Self::EmptyPath { .. } | Self::InvalidRequest(_) => 400,
            Self::NotFound { .. } => 404,
            Self::AlreadyExists { .. } => 409,
            Self::TooLarge { .. } => 413,
            Self::UnsupportedType { .. } => 415,
            Self::TranscodeFailure { .. } => 422,
            Self::ThumbnailFailure { .. }
            | Self::ExtractionFailure { .. }
            | Self::Io { .. }
            | Self::Json { .. }
            | Self::Config(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Returns true when the caller caused the error.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Message safe to show to the caller.
    ///
    /// Client errors always carry their detail. Server-side errors are logged
    /// here with full detail and replaced by a generic message unless
    /// `dev_mode` is set.
    #[must_use]
    pub fn public_message(&self, dev_mode: bool) -> String {
        if self.is_client_error() || dev_mode {
            return self.to_string();
        }

        tracing::error!(error = %self, status = self.status_code(), "Internal pipeline error");
        match self {
            Self::ThumbnailFailure { .. } => "failed to generate thumbnail".to_string(),
            _ => "internal server error".to_string(),
        }
    }
}
