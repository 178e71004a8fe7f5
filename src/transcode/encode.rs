//! Resize and encode steps for a single output format.

use std::borrow::Cow;
use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::error::{EncodingError, ImageFormatHint};
use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageFormat, ImageResult};

use super::options::OutputFormat;

/// Derives a filesystem-safe basename from an upload filename.
///
/// The extension is dropped, every character outside `[A-Za-z0-9._-]`
/// becomes `-`, runs of `-` collapse to one, and leading/trailing `-` and
/// `.` are trimmed. An empty result becomes `image`.
#[must_use]
pub fn slugify_basename(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut slug = String::with_capacity(stem.len());
    for c in stem.chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            c
        } else {
            '-'
        };
        if c == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(c);
    }

    let slug = slug.trim_matches(|c| c == '-' || c == '.');
    if slug.is_empty() {
        "image".to_string()
    } else {
        slug.to_string()
    }
}

/// Scales `image` down to `width`, keeping the aspect ratio.
///
/// Returns the input unchanged when `width` is 0 or not narrower than the
/// source.
pub(crate) fn resize_to_width(image: &DynamicImage, width: u32) -> Cow<'_, DynamicImage> {
    if width == 0 || width >= image.width() {
        return Cow::Borrowed(image);
    }

    let height = (u64::from(image.height()) * u64::from(width) / u64::from(image.width())).max(1);
    let height = u32::try_from(height).unwrap_or(u32::MAX);
    Cow::Owned(image.resize_exact(width, height, FilterType::Lanczos3))
}

/// Encodes `image` into `format` at `quality` (1..=100).
///
/// WebP output is lossy and keeps an alpha channel when present; JPEG
/// drops alpha.
pub(crate) fn encode(image: &DynamicImage, format: OutputFormat, quality: u8) -> ImageResult<Vec<u8>> {
    match format {
        OutputFormat::Webp => encode_webp(image, quality),
        OutputFormat::Jpeg => {
            let mut out = Cursor::new(Vec::new());
            let encoder = JpegEncoder::new_with_quality(&mut out, quality);
            image.to_rgb8().write_with_encoder(encoder)?;
            Ok(out.into_inner())
        },
    }
}

fn encode_webp(image: &DynamicImage, quality: u8) -> ImageResult<Vec<u8>> {
    let (width, height) = (image.width(), image.height());
    let encoded = if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), width, height).encode_simple(false, f32::from(quality))
    } else {
        let rgb = image.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), width, height).encode_simple(false, f32::from(quality))
    };

    encoded.map(|memory| memory.to_vec()).map_err(|e| {
        ImageError::Encoding(EncodingError::new(
            ImageFormatHint::Exact(ImageFormat::WebP),
            format!("webp encoder failed: {e:?}"),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage, RgbaImage};

    #[test]
    fn test_slugify_basename() {
        assert_eq!(slugify_basename("Summer Holiday (1).PNG"), "Summer-Holiday-1");
        assert_eq!(slugify_basename("café_menu.jpg"), "caf-_menu");
        assert_eq!(slugify_basename("a   b.webp"), "a-b");
        assert_eq!(slugify_basename("---.jpg"), "image");
        assert_eq!(slugify_basename(""), "image");
        assert_eq!(slugify_basename("report.v2.tiff"), "report.v2");
    }

    #[test]
    fn test_resize_only_downscales() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(500, 250));

        let smaller = resize_to_width(&img, 100);
        assert_eq!((smaller.width(), smaller.height()), (100, 50));

        assert!(matches!(resize_to_width(&img, 800), Cow::Borrowed(_)));
        assert!(matches!(resize_to_width(&img, 0), Cow::Borrowed(_)));
    }

    #[test]
    fn test_resize_never_collapses_height() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(1000, 1));
        let resized = resize_to_width(&img, 10);
        assert_eq!((resized.width(), resized.height()), (10, 1));
    }

    #[test]
    fn test_encode_produces_decodable_output() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(16, 8));

        let webp = encode(&img, OutputFormat::Webp, 80).unwrap();
        assert_eq!(image::guess_format(&webp).unwrap(), ImageFormat::WebP);
        let decoded = image::load_from_memory(&webp).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));

        let jpeg = encode(&img, OutputFormat::Jpeg, 80).unwrap();
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
    }

    fn patterned(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) % 256) as u8])
        }))
    }

    #[test]
    fn test_webp_quality_changes_output_size() {
        let img = patterned(300, 300);

        let low = encode(&img, OutputFormat::Webp, 5).unwrap();
        let high = encode(&img, OutputFormat::Webp, 100).unwrap();
        assert_eq!(image::guess_format(&low).unwrap(), ImageFormat::WebP);
        assert!(low.len() < high.len(), "q5={} q100={}", low.len(), high.len());
    }

    #[test]
    fn test_webp_keeps_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, image::Rgba([10, 20, 30, 0])));
        let webp = encode(&img, OutputFormat::Webp, 80).unwrap();
        let decoded = image::load_from_memory(&webp).unwrap();
        assert!(decoded.color().has_alpha());
    }
}
