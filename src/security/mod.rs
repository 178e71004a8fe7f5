//! Security utilities for untrusted asset paths and filenames.
//!
//! # Overview
//!
//! - [`error`] - Error types for validation failures
//! - [`path`] - Asset path resolution and boundary checks
//! - [`filename`] - Single-segment filename validation
//!
//! # Key Functions
//!
//! - [`resolve_asset_path`] - Full resolution pipeline for asset paths
//! - [`validate_path_within_base`] - Symlink-aware boundary check
//! - [`validate_windows_path`] - Blocks reserved device names, UNC paths, and ADS
//! - [`sanitize_filename`] - Validates rename targets and archive names

mod error;
mod filename;
mod path;


pub use error::{FilenameError, PathTraversalError};
pub use filename::sanitize_filename;
pub use path::{
    ResolvedPath, WINDOWS_RESERVED_NAMES, normalize_separators, reject_unsafe_input,
    require_file_path, resolve_asset_path, strip_base_prefix, validate_path_within_base,
    validate_windows_path,
};
