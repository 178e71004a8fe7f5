//! Synchronous pipeline operations: metadata, rename, delete, export, reconcile.

use std::fs;
use std::path::Path;

use bytes::Bytes;
use tracing::{error, info, warn};

use super::AssetPipeline;
use super::types::{
    BulkDeleteReport, DeleteOutcome, ExportReport, ItemFailure, ReconcileReport, RenameOutcome,
};
use crate::cache::generate_thumbnail;
use crate::constants::{DERIVATIVE_EXTENSIONS, UPLOAD_EXTENSIONS};
use crate::error::{Error, Result};
use crate::metadata::{MetadataRecord, MetadataUpdate};
use crate::scanner::AssetEntry;
use crate::security::{resolve_asset_path, sanitize_filename};

impl AssetPipeline {
    /// Lists every derivative under the derivative root.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree cannot be read.
    pub fn list_assets(&self) -> Result<Vec<AssetEntry>> {
        self.scanner.scan()
    }

    /// Returns the metadata record for an asset, creating it on first read.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is rejected, the asset does not exist, or
    /// a new record cannot be written.
    pub fn get_metadata(&self, raw: &str) -> Result<MetadataRecord> {
        let resolved = self.locate(raw)?;
        let path = resolved.relative();

        if let Some(record) = self.cache.metadata(path) {
            return Ok(record);
        }

        let record = self.store.load_or_init(path)?;
        self.cache.put_metadata(record.clone());
        Ok(record)
    }

    /// Merges `update` into an asset's record.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is rejected, the asset does not exist, or
    /// the record cannot be written.
    pub fn update_metadata(&self, raw: &str, update: MetadataUpdate) -> Result<MetadataRecord> {
        let resolved = self.locate_exact(raw)?;
        let record = self.store.save(resolved.relative(), update)?;
        self.cache.put_metadata(record.clone());
        Ok(record)
    }

    /// Renders (or serves from cache) a JPEG thumbnail.
    ///
    /// `size` is clamped to 16..=1024; `None` uses the configured default.
    ///
    /// # Errors
    ///
    /// * [`Error::NotFound`] - no such asset
    /// * [`Error::ThumbnailFailure`] - the asset exists but cannot be rendered
    pub fn render_thumbnail(&self, raw: &str, size: Option<u32>) -> Result<Bytes> {
        let size = self.thumbnail_size(size);
        let resolved = self.locate(raw)?;
        let path = resolved.relative();

        if let Some(bytes) = self.cache.thumbnail(path, size) {
            return Ok(bytes);
        }

        let bytes = Bytes::from(generate_thumbnail(resolved.absolute(), path, size)?);
        self.cache.put_thumbnail(path, size, bytes.clone());
        Ok(bytes)
    }

    /// Renames an asset within its date bucket.
    ///
    /// A `new_name` without an image extension inherits the current one;
    /// a different image extension is rejected. The metadata record moves
    /// with the file, and the file move is rolled back if it cannot.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidRequest`] - unsafe name or changed extension
    /// * [`Error::AlreadyExists`] - the target name is taken
    /// * [`Error::NotFound`] - no such asset
    pub fn rename(&self, raw: &str, new_name: &str) -> Result<RenameOutcome> {
        let source = self.locate_exact(raw)?;
        let old_path = source.relative().to_string();

        let name = sanitize_filename(new_name).map_err(|e| Error::from_filename(new_name, &e))?;
        let name = with_kept_extension(&name, source.filename())?;
        let new_path = match old_path.rsplit_once('/') {
            Some((bucket, _)) => format!("{bucket}/{name}"),
            None => name.clone(),
        };

        if new_path == old_path {
            let record = self.store.load(&old_path)?;
            return Ok(RenameOutcome {
                old_path: old_path.clone(),
                new_path: old_path,
                filename: name,
                record,
            });
        }

        let target = resolve_asset_path(&new_path, &self.derivative_root)
            .map_err(|e| Error::from_path(&new_path, e))?;
        if fs::symlink_metadata(target.absolute()).is_ok() {
            return Err(Error::already_exists(new_path));
        }

        fs::rename(source.absolute(), target.absolute())
            .map_err(|e| Error::io(format!("renaming {old_path} to {new_path}"), e))?;

        let record = match self.store.relocate(&old_path, &new_path, &name) {
            Ok(record) => record,
            Err(e) => {
                if let Err(rollback) = fs::rename(target.absolute(), source.absolute()) {
                    error!(
                        from = %new_path,
                        to = %old_path,
                        error = %rollback,
                        "Failed to roll back rename after metadata relocation failed"
                    );
                }
                self.cache.invalidate(&old_path);
                self.cache.invalidate(&new_path);
                return Err(e);
            },
        };

        self.cache.invalidate(&old_path);
        self.cache.invalidate(&new_path);

        info!(from = %old_path, to = %new_path, "Renamed asset");
        Ok(RenameOutcome {
            old_path,
            new_path,
            filename: name,
            record,
        })
    }

    /// Deletes a derivative together with its record and cache entries.
    ///
    /// The archived original is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is rejected, the asset does not exist, or
    /// the file cannot be removed.
    pub fn delete(&self, raw: &str) -> Result<DeleteOutcome> {
        let resolved = self.locate_exact(raw)?;
        let path = resolved.relative().to_string();

        fs::remove_file(resolved.absolute())
            .map_err(|e| Error::io(format!("deleting {path}"), e))?;
        self.cache.invalidate(&path);

        let record_removed = match self.store.remove(&path) {
            Ok(removed) => removed,
            Err(e) => {
                // left for reconcile to collect
                warn!(path = %path, error = %e, "Derivative deleted but metadata record remains");
                false
            },
        };

        info!(path = %path, "Deleted asset");
        Ok(DeleteOutcome {
            path,
            record_removed,
        })
    }

    /// Deletes several assets; each item succeeds or fails on its own.
    #[must_use]
    pub fn bulk_delete(&self, paths: &[String]) -> BulkDeleteReport {
        let mut report = BulkDeleteReport::default();
        for raw in paths {
            match self.delete(raw) {
                Ok(outcome) => report.deleted.push(outcome),
                Err(e) => report.failed.push(ItemFailure::new(raw, &e, self.dev_mode)),
            }
        }
        report
    }

    /// Gathers records for export.
    ///
    /// With no selection every derivative on disk is exported. Invalid or
    /// missing selections are reported per item.
    ///
    /// # Errors
    ///
    /// Returns an error only if the derivative tree cannot be scanned.
    pub fn export_records(&self, selection: Option<&[String]>) -> Result<ExportReport> {
        let paths: Vec<String> = match selection {
            Some(paths) => paths.to_vec(),
            None => self
                .scanner
                .scan()?
                .into_iter()
                .map(|entry| entry.relative_path)
                .collect(),
        };

        let mut report = ExportReport::default();
        for raw in &paths {
            match self.get_metadata(raw) {
                Ok(record) => report.records.push(record),
                Err(e) => report.failed.push(ItemFailure::new(raw, &e, self.dev_mode)),
            }
        }
        Ok(report)
    }

    /// Removes metadata records whose derivative no longer exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata directory cannot be read or an
    /// orphaned record cannot be deleted.
    pub fn reconcile(&self) -> Result<ReconcileReport> {
        let records = self.store.records()?;
        let mut report = ReconcileReport {
            checked: records.len(),
            removed: Vec::new(),
        };

        for record in records {
            let exists = resolve_asset_path(&record.relative_path, &self.derivative_root)
                .is_ok_and(|resolved| resolved.absolute().is_file());
            if exists {
                continue;
            }

            self.store.remove(&record.relative_path)?;
            self.cache.invalidate(&record.relative_path);
            report.removed.push(record.relative_path);
        }

        if !report.removed.is_empty() {
            info!(checked = report.checked, removed = report.removed.len(), "Reconciled metadata records");
        }
        Ok(report)
    }
}

/// Applies the current extension to a rename target.
///
/// A name whose extension is not an image extension is treated as a bare
/// stem (`v1.2` becomes `v1.2.webp`).
fn with_kept_extension(name: &str, current_filename: &str) -> Result<String> {
    let Some(current_ext) = Path::new(current_filename)
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
    else {
        return Ok(name.to_string());
    };

    let requested_ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .filter(|e| is_image_extension(e));

    match requested_ext {
        None => Ok(format!("{name}.{current_ext}")),
        Some(ext) if ext.eq_ignore_ascii_case(&current_ext) => Ok(name.to_string()),
        Some(ext) => Err(Error::InvalidRequest(format!(
            "cannot change extension from .{current_ext} to .{ext}"
        ))),
    }
}

fn is_image_extension(ext: &str) -> bool {
    DERIVATIVE_EXTENSIONS.contains(&ext) || UPLOAD_EXTENSIONS.contains(&ext)
}
