//! Transcode request options.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_OUTPUT_WIDTH, DEFAULT_QUALITY, MAX_OUTPUT_WIDTH};

/// A single encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossy WebP
    Webp,
    /// Baseline JPEG at the requested quality
    Jpeg,
}

impl OutputFormat {
    /// File extension written for this format.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Jpeg => "jpg",
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Jpeg => "jpeg",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Requested output format(s) for an optimize call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatChoice {
    #[default]
    Webp,
    Jpeg,
    /// WebP and JPEG, produced independently
    Both,
}

impl FormatChoice {
    /// The concrete formats this choice expands to.
    #[must_use]
    pub fn outputs(self) -> &'static [OutputFormat] {
        match self {
            Self::Webp => &[OutputFormat::Webp],
            Self::Jpeg => &[OutputFormat::Jpeg],
            Self::Both => &[OutputFormat::Webp, OutputFormat::Jpeg],
        }
    }
}

impl FromStr for FormatChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webp" => Ok(Self::Webp),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "both" => Ok(Self::Both),
            other => Err(format!(
                "unknown format '{other}' (expected webp, jpeg or both)"
            )),
        }
    }
}

impl fmt::Display for FormatChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Webp => "webp",
            Self::Jpeg => "jpeg",
            Self::Both => "both",
        })
    }
}

/// Width, quality and format for one optimize call.
///
/// Construct with [`OptimizeOptions::new`] to get clamped values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizeOptions {
    /// Target width in pixels; 0 keeps the native width
    pub width: u32,
    /// Encoder quality, 1-100 (JPEG only)
    pub quality: u8,
    pub format: FormatChoice,
}

impl OptimizeOptions {
    /// Builds options, clamping width to `0..=10000` and quality to `1..=100`.
    ///
    /// Omitted values fall back to the defaults (1920 wide, quality 80).
    #[must_use]
    pub fn new(width: Option<u32>, quality: Option<u32>, format: FormatChoice) -> Self {
        let width = width.unwrap_or(DEFAULT_OUTPUT_WIDTH).min(MAX_OUTPUT_WIDTH);
        let quality = quality.map_or(DEFAULT_QUALITY, |q| {
            u8::try_from(q.clamp(1, 100)).unwrap_or(DEFAULT_QUALITY)
        });

        Self {
            width,
            quality,
            format,
        }
    }

    /// Re-applies the clamps to values set directly on the struct.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self::new(Some(self.width), Some(u32::from(self.quality)), self.format)
    }
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self::new(None, None, FormatChoice::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_width_and_quality() {
        let opts = OptimizeOptions::new(Some(50_000), Some(0), FormatChoice::Jpeg);
        assert_eq!(opts.width, 10_000);
        assert_eq!(opts.quality, 1);

        let opts = OptimizeOptions::new(Some(0), Some(400), FormatChoice::Webp);
        assert_eq!(opts.width, 0);
        assert_eq!(opts.quality, 100);
    }

    #[test]
    fn test_defaults() {
        let opts = OptimizeOptions::default();
        assert_eq!(opts.width, 1920);
        assert_eq!(opts.quality, 80);
        assert_eq!(opts.format, FormatChoice::Webp);
    }

    #[test]
    fn test_clamped_fixes_direct_assignment() {
        let opts = OptimizeOptions {
            width: 20_000,
            quality: 0,
            format: FormatChoice::Both,
        }
        .clamped();
        assert_eq!((opts.width, opts.quality), (10_000, 1));
    }

    #[test]
    fn test_format_choice_parsing() {
        assert_eq!("WEBP".parse::<FormatChoice>().unwrap(), FormatChoice::Webp);
        assert_eq!("jpg".parse::<FormatChoice>().unwrap(), FormatChoice::Jpeg);
        assert_eq!("both".parse::<FormatChoice>().unwrap(), FormatChoice::Both);
        assert!("avif".parse::<FormatChoice>().is_err());
        assert_eq!(FormatChoice::Both.outputs().len(), 2);
    }

    #[test]
    fn test_output_format_extension() {
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
        assert_eq!(OutputFormat::Jpeg.to_string(), "jpeg");
        assert_eq!(OutputFormat::Webp.extension(), "webp");
    }
}
