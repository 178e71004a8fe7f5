//! Thumbnail generation for cache misses.

use std::io::Cursor;
use std::path::Path;

use image::ImageReader;
use image::codecs::jpeg::JpegEncoder;

use crate::constants::{
    DEFAULT_THUMBNAIL_SIZE, MAX_THUMBNAIL_SIZE, MIN_THUMBNAIL_SIZE, THUMBNAIL_QUALITY,
};
use crate::error::{Error, Result};

/// Clamps a requested thumbnail edge to the supported range.
///
/// `None` selects the default size.
#[must_use]
pub fn clamp_thumbnail_size(requested: Option<u32>) -> u32 {
    requested
        .unwrap_or(DEFAULT_THUMBNAIL_SIZE)
        .clamp(MIN_THUMBNAIL_SIZE, MAX_THUMBNAIL_SIZE)
}

/// Renders a JPEG thumbnail fitting inside a `size` x `size` box.
///
/// Aspect ratio is preserved and images already inside the box are not
/// upscaled. `label` names the asset in errors.
///
/// # Errors
///
/// * [`Error::NotFound`] - `source` does not exist
/// * [`Error::ThumbnailFailure`] - the file exists but cannot be decoded or encoded
pub fn generate_thumbnail(source: &Path, label: &str, size: u32) -> Result<Vec<u8>> {
    if !source.is_file() {
        return Err(Error::not_found(label));
    }

    let image = ImageReader::open(source)
        .map_err(|e| Error::thumbnail(label, e))?
        .with_guessed_format()
        .map_err(|e| Error::thumbnail(label, e))?
        .decode()
        .map_err(|e| Error::thumbnail(label, e))?;

    let image = if image.width() > size || image.height() > size {
        image.thumbnail(size, size)
    } else {
        image
    };

    let mut out = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut out, THUMBNAIL_QUALITY);
    image
        .to_rgb8()
        .write_with_encoder(encoder)
        .map_err(|e| Error::thumbnail(label, e))?;

    Ok(out.into_inner())
}
