//! Shared limits and defaults.

/// Default derivative (optimized output) root directory name.
pub const DEFAULT_DERIVATIVE_DIR: &str = "optimized";

/// Default archive root for byte-identical originals.
pub const DEFAULT_ARCHIVE_DIR: &str = "originals";

/// Default metadata root (one JSON file per asset).
pub const DEFAULT_METADATA_DIR: &str = "metadata";

/// Default maximum number of entries per in-memory cache.
pub const DEFAULT_CACHE_ENTRIES: usize = 500;

/// Default cache entry time-to-live in seconds (one hour).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Default upload size limit in megabytes.
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 50;

/// Upper bound for requested output widths.
pub const MAX_OUTPUT_WIDTH: u32 = 10_000;

/// Default output width when the caller does not supply one.
pub const DEFAULT_OUTPUT_WIDTH: u32 = 1920;

/// Default encoder quality (1-100).
pub const DEFAULT_QUALITY: u8 = 80;

/// Fixed JPEG quality for thumbnails.
pub const THUMBNAIL_QUALITY: u8 = 75;

/// Default thumbnail bounding box edge.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 300;

/// Smallest thumbnail edge a caller may request.
pub const MIN_THUMBNAIL_SIZE: u32 = 16;

/// Largest thumbnail edge a caller may request.
pub const MAX_THUMBNAIL_SIZE: u32 = 1024;

/// Maximum number of keywords kept on a metadata record.
pub const MAX_KEYWORDS: usize = 20;

/// Maximum length (in characters) of a single keyword.
pub const MAX_KEYWORD_LEN: usize = 50;

/// Maximum filename length accepted for renames and archives.
pub const MAX_FILENAME_LEN: usize = 255;

/// Highest numeric suffix tried when an upload's names are taken.
pub const MAX_NAME_SUFFIX: u32 = 9_999;

/// Upload extensions accepted by the transcoder (lowercase).
pub const UPLOAD_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "tif", "tiff"];

/// Extensions the scanner treats as derivative assets (lowercase).
pub const DERIVATIVE_EXTENSIONS: &[&str] = &["webp", "jpg", "jpeg", "png", "gif"];

/// Environment variable overriding the base directory for relative roots.
pub const HOME_ENV_VAR: &str = "ASSET_PIPELINE_HOME";

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "assetctl.toml";
