//! Configuration for the asset pipeline.
//!
//! Settings are read from `assetctl.toml`:
//!
//! - [`StorageConfig`] - derivative, archive and metadata roots
//! - [`CacheSettings`] - LRU capacity and TTL for both caches
//! - [`UploadConfig`] - size limit and optimize defaults
//! - [`ThumbnailConfig`] - default thumbnail edge
//! - [`LoggingConfig`] - level and output format
//!
//! Every field has a default, so an empty file (or no file) is valid.
//! Relative roots resolve against `ASSET_PIPELINE_HOME` when set, otherwise
//! against the directory holding the config file.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::constants;
use crate::transcode::{FormatChoice, OptimizeOptions};

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal warnings that should be logged but don't prevent operation.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if there are any warnings.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Root configuration (`assetctl.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub storage: StorageConfig,
    pub cache: CacheSettings,
    pub upload: UploadConfig,
    pub thumbnail: ThumbnailConfig,
    pub logging: LoggingConfig,
    /// Expose internal error detail to callers
    pub dev_mode: bool,
    /// Directory relative roots resolve against; set by [`PipelineConfig::load_from`]
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub derivative_root: PathBuf,
    pub archive_root: PathBuf,
    pub metadata_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            derivative_root: PathBuf::from(constants::DEFAULT_DERIVATIVE_DIR),
            archive_root: PathBuf::from(constants::DEFAULT_ARCHIVE_DIR),
            metadata_root: PathBuf::from(constants::DEFAULT_METADATA_DIR),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub max_entries: usize,
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: constants::DEFAULT_CACHE_ENTRIES,
            ttl_secs: constants::DEFAULT_CACHE_TTL_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_file_size_mb: u64,
    pub default_width: u32,
    pub default_quality: u32,
    pub default_format: FormatChoice,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: constants::DEFAULT_MAX_UPLOAD_MB,
            default_width: constants::DEFAULT_OUTPUT_WIDTH,
            default_quality: u32::from(constants::DEFAULT_QUALITY),
            default_format: FormatChoice::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    pub default_size: u32,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            default_size: constants::DEFAULT_THUMBNAIL_SIZE,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (IO error)
    /// - The file contains invalid TOML syntax
    /// - Fields have invalid types
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.base_dir = path.parent().map(Path::to_path_buf);

        Ok(config)
    }

    /// Load from `path` if it exists, otherwise use defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be loaded.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Base directory for relative roots.
    ///
    /// `ASSET_PIPELINE_HOME` wins over the config file's directory.
    #[must_use]
    pub fn home(&self) -> PathBuf {
        self.home_with(std::env::var_os(constants::HOME_ENV_VAR))
    }

    fn home_with(&self, env_home: Option<OsString>) -> PathBuf {
        env_home
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| self.base_dir.clone())
            .unwrap_or_default()
    }

    /// Resolves a configured root against [`PipelineConfig::home`].
    #[must_use]
    pub fn resolve_root(&self, root: &Path) -> PathBuf {
        if root.is_absolute() {
            root.to_path_buf()
        } else {
            self.home().join(root)
        }
    }

    #[must_use]
    pub fn derivative_root(&self) -> PathBuf {
        self.resolve_root(&self.storage.derivative_root)
    }

    #[must_use]
    pub fn archive_root(&self) -> PathBuf {
        self.resolve_root(&self.storage.archive_root)
    }

    #[must_use]
    pub fn metadata_root(&self) -> PathBuf {
        self.resolve_root(&self.storage.metadata_root)
    }

    /// Cache sizing for both caches.
    #[must_use]
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new(self.cache.max_entries, Duration::from_secs(self.cache.ttl_secs))
    }

    /// Upload limit in bytes.
    #[must_use]
    pub fn max_upload_bytes(&self) -> u64 {
        self.upload.max_file_size_mb.saturating_mul(1024 * 1024)
    }

    /// Optimize options built from the upload defaults, with optional overrides.
    #[must_use]
    pub fn optimize_options(
        &self,
        width: Option<u32>,
        quality: Option<u32>,
        format: Option<FormatChoice>,
    ) -> OptimizeOptions {
        OptimizeOptions::new(
            Some(width.unwrap_or(self.upload.default_width)),
            Some(quality.unwrap_or(self.upload.default_quality)),
            format.unwrap_or(self.upload.default_format),
        )
    }

    /// Validate configuration with comprehensive checks.
    ///
    /// Returns a `ValidationResult` containing any non-fatal warnings.
    ///
    /// # Errors
    ///
    /// Returns an error listing every fatal problem:
    /// - Zero cache size or zero upload limit
    /// - Default quality outside 1-100
    /// - Two storage roots pointing at the same directory
    /// - Unknown log level
    pub fn validate(&self) -> Result<ValidationResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // 1. Cache
        if self.cache.max_entries == 0 {
            errors.push(
                "cache.max_entries cannot be 0. Set a positive number (default: 500)".to_string(),
            );
        }
        if self.cache.ttl_secs == 0 {
            warnings.push(
                "cache.ttl_secs is 0: every cached entry expires immediately".to_string(),
            );
        }

        // 2. Upload
        if self.upload.max_file_size_mb == 0 {
            errors.push(
                "upload.max_file_size_mb cannot be 0. Set a positive limit (default: 50)"
                    .to_string(),
            );
        }
        if !(1..=100).contains(&self.upload.default_quality) {
            errors.push(format!(
                "upload.default_quality must be between 1 and 100 (got: {})",
                self.upload.default_quality
            ));
        }
        if self.upload.default_width > constants::MAX_OUTPUT_WIDTH {
            warnings.push(format!(
                "upload.default_width {} exceeds {} and will be clamped",
                self.upload.default_width,
                constants::MAX_OUTPUT_WIDTH
            ));
        }

        // 3. Thumbnails
        let size = self.thumbnail.default_size;
        if !(constants::MIN_THUMBNAIL_SIZE..=constants::MAX_THUMBNAIL_SIZE).contains(&size) {
            warnings.push(format!(
                "thumbnail.default_size {size} is outside {}-{} and will be clamped",
                constants::MIN_THUMBNAIL_SIZE,
                constants::MAX_THUMBNAIL_SIZE
            ));
        }

        // 4. Storage roots must be distinct
        let roots = [
            ("storage.derivative_root", self.derivative_root()),
            ("storage.archive_root", self.archive_root()),
            ("storage.metadata_root", self.metadata_root()),
        ];
        for (i, (name_a, a)) in roots.iter().enumerate() {
            for (name_b, b) in &roots[i + 1..] {
                if a == b {
                    errors.push(format!(
                        "{name_a} and {name_b} point at the same directory: {}",
                        a.display()
                    ));
                }
            }
        }
        if !self.derivative_root().exists() {
            warnings.push(format!(
                "Derivative root does not exist yet: {}",
                self.derivative_root().display()
            ));
        }

        // 5. Logging
        let level = self.logging.level.to_ascii_lowercase();
        if !["trace", "debug", "info", "warn", "error", "off"].contains(&level.as_str()) {
            errors.push(format!(
                "logging.level '{}' is not one of trace, debug, info, warn, error, off",
                self.logging.level
            ));
        }

        if self.dev_mode {
            warnings.push(
                "dev_mode is enabled: internal error details are exposed to callers".to_string(),
            );
        }

        if !errors.is_empty() {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }

        Ok(ValidationResult { warnings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_with_base(base: &Path) -> PipelineConfig {
        PipelineConfig {
            base_dir: Some(base.to_path_buf()),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config: PipelineConfig = toml::from_str("").unwrap();
        assert_eq!(config.cache.max_entries, 500);
        assert_eq!(config.cache.ttl_secs, 3600);
        assert_eq!(config.upload.max_file_size_mb, 50);
        assert_eq!(config.thumbnail.default_size, 300);
        assert_eq!(config.storage.derivative_root, PathBuf::from("optimized"));
        assert!(!config.dev_mode);
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
dev_mode = true

[storage]
derivative_root = "/srv/assets/optimized"
archive_root = "/srv/assets/originals"
metadata_root = "/srv/assets/metadata"

[cache]
max_entries = 50
ttl_secs = 60

[upload]
max_file_size_mb = 10
default_width = 1200
default_quality = 70
default_format = "both"

[logging]
level = "debug"
format = "json"
"#;
        let config: PipelineConfig = toml::from_str(toml_str).unwrap();
        assert!(config.dev_mode);
        assert_eq!(config.cache.max_entries, 50);
        assert_eq!(config.upload.default_format, FormatChoice::Both);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.max_upload_bytes(), 10 * 1024 * 1024);
        assert_eq!(config.derivative_root(), PathBuf::from("/srv/assets/optimized"));
    }

    #[test]
    fn test_load_from_sets_base_dir() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("assetctl.toml");
        fs::write(&path, "[cache]\nmax_entries = 7\n").unwrap();

        let config = PipelineConfig::load_from(&path).unwrap();
        assert_eq!(config.cache.max_entries, 7);
        assert_eq!(config.base_dir.as_deref(), Some(tmp.path()));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let tmp = TempDir::new().unwrap();
        let config = PipelineConfig::load_or_default(tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.cache.max_entries, 500);
    }

    #[test]
    fn test_load_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("assetctl.toml");
        fs::write(&path, "[cache\nmax_entries = ").unwrap();

        let err = PipelineConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_validate_default_config() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("optimized")).unwrap();
        let result = config_with_base(tmp.path()).validate().unwrap();
        assert!(!result.has_warnings(), "{:?}", result.warnings);
    }

    #[test]
    fn test_validate_multiple_errors() {
        let tmp = TempDir::new().unwrap();
        let mut config = config_with_base(tmp.path());
        config.cache.max_entries = 0;
        config.upload.max_file_size_mb = 0;
        config.upload.default_quality = 0;
        config.storage.metadata_root = PathBuf::from("optimized");

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("cache.max_entries"));
        assert!(err.contains("upload.max_file_size_mb"));
        assert!(err.contains("default_quality"));
        assert!(err.contains("same directory"));
    }

    #[test]
    fn test_validate_warnings() {
        let tmp = TempDir::new().unwrap();
        let mut config = config_with_base(tmp.path());
        config.thumbnail.default_size = 4096;
        config.dev_mode = true;

        let result = config.validate().unwrap();
        assert!(result.warnings.iter().any(|w| w.contains("thumbnail.default_size")));
        assert!(result.warnings.iter().any(|w| w.contains("dev_mode")));
        assert!(result.warnings.iter().any(|w| w.contains("does not exist")));
    }

    #[test]
    fn test_validate_bad_log_level() {
        let tmp = TempDir::new().unwrap();
        let mut config = config_with_base(tmp.path());
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_optimize_options_from_defaults() {
        let mut config = PipelineConfig::default();
        config.upload.default_width = 800;
        config.upload.default_format = FormatChoice::Jpeg;

        let opts = config.optimize_options(None, Some(500), None);
        assert_eq!(opts.width, 800);
        assert_eq!(opts.quality, 100);
        assert_eq!(opts.format, FormatChoice::Jpeg);
    }

    #[test]
    fn test_home_env_overrides_config_dir() {
        let config = config_with_base(Path::new("/from/config"));
        assert_eq!(
            config.home_with(Some(OsString::from("/from/env"))),
            PathBuf::from("/from/env")
        );
        assert_eq!(config.home_with(Some(OsString::new())), PathBuf::from("/from/config"));
        assert_eq!(config.home_with(None), PathBuf::from("/from/config"));
        assert_eq!(PipelineConfig::default().home_with(None), PathBuf::new());
    }

    #[test]
    fn test_absolute_roots_ignore_base() {
        let config = config_with_base(Path::new("/somewhere"));
        assert_eq!(
            config.resolve_root(Path::new("/abs/optimized")),
            PathBuf::from("/abs/optimized")
        );
    }
}
