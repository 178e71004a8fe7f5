//! Async pipeline operations.
//!
//! Blocking operations are wrapped in `spawn_blocking` to keep the async
//! runtime responsive. Optimize work is natively async: the transcoder
//! fans out per format and [`AssetPipeline::optimize_batch`] fans out per
//! file.

use bytes::Bytes;
use futures::future::join_all;

use super::AssetPipeline;
use super::types::{
    BatchReport, BulkDeleteReport, DeleteOutcome, ExportReport, ItemFailure, ReconcileReport,
    RenameOutcome, Upload,
};
use crate::error::{Error, Result};
use crate::metadata::{MetadataRecord, MetadataUpdate};
use crate::scanner::AssetEntry;
use crate::transcode::{OptimizeOptions, OptimizeReport};
use crate::upload::validate_upload;

impl AssetPipeline {
    /// Validates and transcodes one upload.
    ///
    /// Cached entries for every derivative written are invalidated, so a path
    /// reused after a delete never serves stale bytes.
    ///
    /// # Errors
    ///
    /// * [`Error::UnsupportedType`] / [`Error::TooLarge`] - rejected before decoding
    /// * [`Error::TranscodeFailure`] - undecodable upload, or every format failed
    pub async fn optimize(
        &self,
        data: Bytes,
        filename: &str,
        options: OptimizeOptions,
    ) -> Result<OptimizeReport> {
        validate_upload(filename, data.len() as u64, self.max_upload_bytes)?;

        let report = self.transcoder.optimize(data, filename, options).await?;
        for derivative in &report.derivatives {
            self.cache.invalidate(&derivative.relative_path);
        }
        Ok(report)
    }

    /// Optimizes several uploads concurrently; each file fails on its own.
    pub async fn optimize_batch(&self, uploads: Vec<Upload>, options: OptimizeOptions) -> BatchReport {
        let jobs = uploads.into_iter().map(|upload| async move {
            let outcome = self.optimize(upload.data, &upload.filename, options).await;
            (upload.filename, outcome)
        });

        let mut report = BatchReport::default();
        for (filename, outcome) in join_all(jobs).await {
            match outcome {
                Ok(optimized) => report.succeeded.push(optimized),
                Err(e) => report.failed.push(ItemFailure::new(filename, &e, self.dev_mode)),
            }
        }
        report
    }

    /// Thumbnail bytes for an asset, served from cache when possible.
    ///
    /// Async version of `render_thumbnail` that uses `spawn_blocking`.
    ///
    /// # Errors
    ///
    /// See [`AssetPipeline::render_thumbnail`].
    pub async fn thumbnail(&self, raw: String, size: Option<u32>) -> Result<Bytes> {
        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || pipeline.render_thumbnail(&raw, size))
            .await
            .map_err(|e| Error::join(&e))?
    }

    /// Async version of `list_assets` that uses `spawn_blocking`.
    ///
    /// # Errors
    ///
    /// See [`AssetPipeline::list_assets`].
    pub async fn list_assets_async(&self) -> Result<Vec<AssetEntry>> {
        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || pipeline.list_assets())
            .await
            .map_err(|e| Error::join(&e))?
    }

    /// Async version of `get_metadata` that uses `spawn_blocking`.
    ///
    /// # Errors
    ///
    /// See [`AssetPipeline::get_metadata`].
    pub async fn get_metadata_async(&self, raw: String) -> Result<MetadataRecord> {
        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || pipeline.get_metadata(&raw))
            .await
            .map_err(|e| Error::join(&e))?
    }

    /// Async version of `update_metadata` that uses `spawn_blocking`.
    ///
    /// # Errors
    ///
    /// See [`AssetPipeline::update_metadata`].
    pub async fn update_metadata_async(
        &self,
        raw: String,
        update: MetadataUpdate,
    ) -> Result<MetadataRecord> {
        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || pipeline.update_metadata(&raw, update))
            .await
            .map_err(|e| Error::join(&e))?
    }

    /// Async version of `rename` that uses `spawn_blocking`.
    ///
    /// # Errors
    ///
    /// See [`AssetPipeline::rename`].
    pub async fn rename_async(&self, raw: String, new_name: String) -> Result<RenameOutcome> {
        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || pipeline.rename(&raw, &new_name))
            .await
            .map_err(|e| Error::join(&e))?
    }

    /// Async version of `delete` that uses `spawn_blocking`.
    ///
    /// # Errors
    ///
    /// See [`AssetPipeline::delete`].
    pub async fn delete_async(&self, raw: String) -> Result<DeleteOutcome> {
        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || pipeline.delete(&raw))
            .await
            .map_err(|e| Error::join(&e))?
    }

    /// Async version of `bulk_delete` that uses `spawn_blocking`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the blocking task fails to complete.
    pub async fn bulk_delete_async(&self, paths: Vec<String>) -> Result<BulkDeleteReport> {
        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || pipeline.bulk_delete(&paths))
            .await
            .map_err(|e| Error::join(&e))
    }

    /// Async version of `export_records` that uses `spawn_blocking`.
    ///
    /// # Errors
    ///
    /// See [`AssetPipeline::export_records`].
    pub async fn export_records_async(&self, selection: Option<Vec<String>>) -> Result<ExportReport> {
        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || pipeline.export_records(selection.as_deref()))
            .await
            .map_err(|e| Error::join(&e))?
    }

    /// Async version of `reconcile` that uses `spawn_blocking`.
    ///
    /// # Errors
    ///
    /// See [`AssetPipeline::reconcile`].
    pub async fn reconcile_async(&self) -> Result<ReconcileReport> {
        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || pipeline.reconcile())
            .await
            .map_err(|e| Error::join(&e))?
    }
}
