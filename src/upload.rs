//! Upload admission checks, applied before any bytes reach the transcoder.

use std::path::Path;

use tracing::warn;

use crate::constants::UPLOAD_EXTENSIONS;
use crate::error::{Error, Result};

/// Rejects uploads with an unsupported type or an oversized body.
///
/// The extension must be in the supported set (case-insensitive) and must
/// map to an `image/*` MIME type.
///
/// # Errors
///
/// * [`Error::UnsupportedType`] - extension missing, unknown, or not an image type
/// * [`Error::TooLarge`] - `size` exceeds `max_bytes`
pub fn validate_upload(filename: &str, size: u64, max_bytes: u64) -> Result<()> {
    let extension = Path::new(filename)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());

    let supported = extension
        .as_deref()
        .is_some_and(|ext| UPLOAD_EXTENSIONS.contains(&ext));
    let is_image = mime_guess::from_path(filename)
        .first()
        .is_some_and(|mime| mime.type_() == mime_guess::mime::IMAGE);

    if !supported || !is_image {
        warn!(file = %filename, "Rejected upload with unsupported type");
        return Err(Error::UnsupportedType {
            filename: filename.to_string(),
        });
    }

    if size > max_bytes {
        warn!(file = %filename, size, max = max_bytes, "Rejected oversized upload");
        return Err(Error::TooLarge {
            filename: filename.to_string(),
            size,
            max: max_bytes,
        });
    }

    Ok(())
}
