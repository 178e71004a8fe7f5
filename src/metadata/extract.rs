//! Technical attribute extraction from derivative files.
//!
//! Reads only the image header (dimensions, color type) plus filesystem
//! metadata; pixel data is never decoded here.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use image::{ColorType, ImageDecoder, ImageFormat, ImageReader};

use super::types::TechnicalInfo;
use crate::error::{Error, Result};
use crate::transcode::slugify_basename;

/// Extract technical attributes for the derivative at `derivative`.
///
/// `relative_path` is the derivative's canonical path; it is used to find the
/// archived original under `archive_root` (same date bucket, same stem).
///
/// # Errors
///
/// Returns [`Error::ExtractionFailure`] if the file cannot be stat'ed or its
/// header cannot be read.
pub(crate) fn extract_technical(
    derivative: &Path,
    archive_root: &Path,
    relative_path: &str,
) -> Result<TechnicalInfo> {
    let stat = fs::metadata(derivative).map_err(|e| Error::extraction(derivative, e))?;

    let reader = ImageReader::open(derivative)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| Error::extraction(derivative, e))?;
    let format = reader.format().map(|f| format_name(f).to_string());
    let decoder = reader
        .into_decoder()
        .map_err(|e| Error::extraction(derivative, e))?;
    let (width, height) = decoder.dimensions();
    let color = decoder.color_type();

    let modified_at = stat
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    let created_at = stat
        .created()
        .map(DateTime::<Utc>::from)
        .unwrap_or(modified_at);

    let original = find_archived_original(archive_root, relative_path);
    let (original_path, original_size) = match original {
        Some((path, size)) => (Some(path), size),
        None => (None, stat.len()),
    };

    Ok(TechnicalInfo {
        width,
        height,
        format,
        color_space: color_space(color).to_string(),
        has_alpha: color.has_alpha(),
        file_size: stat.len(),
        original_size,
        original_path,
        created_at,
        modified_at,
    })
}

/// Locate the archived original for a derivative.
///
/// Originals keep their upload filename while derivatives use its slug, so
/// the match is by date bucket and either the exact stem or the slugified
/// name. Exact stem matches win. Returns the archive-relative path and size.
pub(crate) fn find_archived_original(archive_root: &Path, relative_path: &str) -> Option<(String, u64)> {
    let relative = Path::new(relative_path);
    let stem = relative.file_stem()?;
    let stem_str = stem.to_string_lossy();
    let bucket = relative.parent().unwrap_or(Path::new(""));

    let mut candidates: Vec<_> = fs::read_dir(archive_root.join(bucket))
        .ok()?
        .flatten()
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter_map(|entry| {
            let name = entry.file_name();
            let exact = Path::new(&name).file_stem() == Some(stem);
            let matches = exact || slugify_basename(&name.to_string_lossy()) == stem_str;
            matches.then_some((!exact, entry))
        })
        .collect();
    candidates.sort_by_key(|(inexact, entry)| (*inexact, entry.file_name()));

    let (_, entry) = candidates.into_iter().next()?;
    let size = entry.metadata().ok()?.len();
    let name = entry.file_name().to_string_lossy().into_owned();
    let path = if bucket.as_os_str().is_empty() {
        name
    } else {
        format!("{}/{name}", bucket.to_string_lossy().replace('\\', "/"))
    };

    Some((path, size))
}

/// Short lowercase name for an image container format.
#[must_use]
pub fn format_name(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Png => "png",
        ImageFormat::WebP => "webp",
        ImageFormat::Gif => "gif",
        ImageFormat::Bmp => "bmp",
        ImageFormat::Tiff => "tiff",
        ImageFormat::Avif => "avif",
        other => other.extensions_str().first().copied().unwrap_or("unknown"),
    }
}

fn color_space(color: ColorType) -> &'static str {
    if color.has_color() { "srgb" } else { "b-w" }
}
