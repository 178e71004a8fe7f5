//! Pipeline facade over the resolver, stores, cache and transcoder.
//!
//! This is the surface an HTTP layer or the CLI consumes. Every operation
//! that takes a caller-supplied path resolves it through
//! [`resolve_asset_path`] first; nothing touches the filesystem with an
//! unresolved path.
//!
//! # Async Usage
//!
//! Filesystem and codec work is blocking. From async contexts use the
//! `*_async` methods, [`AssetPipeline::thumbnail`] and
//! [`AssetPipeline::optimize`], which run on the blocking pool.

mod async_ops;
mod operations;
mod types;


use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

pub use types::{
    BatchReport, BulkDeleteReport, DeleteOutcome, ExportReport, ItemFailure, ReconcileReport,
    RenameOutcome, Upload,
};

use crate::cache::{AssetCache, AssetCacheStats, clamp_thumbnail_size};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::metadata::MetadataStore;
use crate::scanner::AssetScanner;
use crate::security::{ResolvedPath, resolve_asset_path};
use crate::transcode::Transcoder;

/// Asset pipeline service.
///
/// # Thread Safety
///
/// `AssetPipeline` is `Clone` and can be shared across tasks; clones share
/// the same caches.
#[derive(Clone)]
pub struct AssetPipeline {
    derivative_root: PathBuf,
    store: MetadataStore,
    cache: Arc<AssetCache>,
    scanner: AssetScanner,
    transcoder: Transcoder,
    max_upload_bytes: u64,
    default_thumbnail_size: u32,
    dev_mode: bool,
}

impl AssetPipeline {
    /// Opens the pipeline, creating the storage roots if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if any storage root cannot be created.
    pub fn open(config: &PipelineConfig) -> Result<Self> {
        let derivative_root = config.derivative_root();
        let archive_root = config.archive_root();
        for root in [&derivative_root, &archive_root] {
            fs::create_dir_all(root)
                .map_err(|e| Error::io(format!("creating {}", root.display()), e))?;
        }

        let store = MetadataStore::open(config.metadata_root(), &derivative_root, &archive_root)?;
        let transcoder = Transcoder::new(&derivative_root, &archive_root, store.clone());

        debug!(
            derivatives = %derivative_root.display(),
            originals = %archive_root.display(),
            metadata = %store.root().display(),
            "Opened asset pipeline"
        );

        Ok(Self {
            scanner: AssetScanner::new(&derivative_root),
            derivative_root,
            store,
            cache: Arc::new(AssetCache::new(config.cache_config())),
            transcoder,
            max_upload_bytes: config.max_upload_bytes(),
            default_thumbnail_size: clamp_thumbnail_size(Some(config.thumbnail.default_size)),
            dev_mode: config.dev_mode,
        })
    }

    /// Derivative root directory.
    #[must_use]
    pub fn derivative_root(&self) -> &Path {
        &self.derivative_root
    }

    /// Underlying metadata store.
    #[must_use]
    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    /// Whether internal error detail is exposed to callers.
    #[must_use]
    pub fn dev_mode(&self) -> bool {
        self.dev_mode
    }

    /// Counters for the thumbnail and metadata caches.
    #[must_use]
    pub fn cache_stats(&self) -> AssetCacheStats {
        self.cache.stats()
    }

    /// Resolves a caller-supplied path to a derivative that exists at
    /// exactly that location.
    ///
    /// Mutating operations use this so a stale path can never be retargeted
    /// to another asset that happens to share its filename.
    ///
    /// # Errors
    ///
    /// * [`Error::PathTraversal`] / [`Error::EmptyPath`] - the path was rejected
    /// * [`Error::NotFound`] - nothing exists at the resolved path
    pub fn locate_exact(&self, raw: &str) -> Result<ResolvedPath> {
        let resolved = self.resolve(raw)?;
        if resolved.absolute().is_file() {
            Ok(resolved)
        } else {
            Err(Error::not_found(resolved.relative()))
        }
    }

    /// Resolves a caller-supplied path for a read, with a lookup by filename.
    ///
    /// When the path is valid but nothing exists there, the tree is searched
    /// for a derivative with the same filename, and that hit is resolved
    /// again through the full resolver before use. A path rejected by the
    /// resolver never reaches the secondary lookup. Only read operations
    /// use this; see [`AssetPipeline::locate_exact`].
    ///
    /// # Errors
    ///
    /// * [`Error::PathTraversal`] / [`Error::EmptyPath`] - the path was rejected
    /// * [`Error::NotFound`] - no derivative exists under either lookup
    pub fn locate(&self, raw: &str) -> Result<ResolvedPath> {
        let resolved = self.resolve(raw)?;
        if resolved.absolute().is_file() {
            return Ok(resolved);
        }

        let Some(found) = self.scanner.find_by_filename(resolved.filename())? else {
            return Err(Error::not_found(resolved.relative()));
        };
        let fallback = resolve_asset_path(&found, &self.derivative_root)
            .map_err(|e| Error::from_path(&found, e))?;
        if !fallback.absolute().is_file() {
            return Err(Error::not_found(resolved.relative()));
        }

        debug!(requested = %resolved.relative(), found = %fallback.relative(), "Resolved by filename");
        Ok(fallback)
    }

    fn resolve(&self, raw: &str) -> Result<ResolvedPath> {
        resolve_asset_path(raw, &self.derivative_root).map_err(|e| Error::from_path(raw, e))
    }

    fn thumbnail_size(&self, requested: Option<u32>) -> u32 {
        clamp_thumbnail_size(Some(requested.unwrap_or(self.default_thumbnail_size)))
    }
}
