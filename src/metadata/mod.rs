//! Per-asset metadata store.
//!
//! One JSON file per derivative, stored at `<metadata-root>/<key>.json`
//! where the key is derived from the asset's canonical relative path (see
//! [`metadata_key`]). Records are created at transcode time or lazily on
//! first read, merged on update, re-keyed on rename, and removed on delete.
//!
//! Saves are read-merge-write. Two concurrent saves to the same asset race
//! and the later write wins; every individual write is atomic (temp file +
//! rename), so a reader never observes a half-written record.

mod extract;
mod key;
mod types;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, warn};

pub use extract::format_name;
pub use key::metadata_key;
pub use types::{MetadataRecord, MetadataUpdate, TechnicalInfo, normalize_keywords};

use crate::error::{Error, Result};
use crate::security::resolve_asset_path;

/// Filesystem-backed metadata store.
///
/// `MetadataStore` is `Clone` and can be shared across threads; it holds
/// only directory paths.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    root: PathBuf,
    derivative_root: PathBuf,
    archive_root: PathBuf,
}

impl MetadataStore {
    /// Opens (creating if needed) the store rooted at `root`.
    ///
    /// `derivative_root` and `archive_root` are consulted when a record has
    /// to be synthesized from the files on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata directory cannot be created.
    pub fn open(
        root: impl Into<PathBuf>,
        derivative_root: impl Into<PathBuf>,
        archive_root: impl Into<PathBuf>,
    ) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            Error::io(format!("creating metadata directory {}", root.display()), e)
        })?;

        Ok(Self {
            root,
            derivative_root: derivative_root.into(),
            archive_root: archive_root.into(),
        })
    }

    /// Metadata root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the record file for a canonical path.
    #[must_use]
    pub fn record_path(&self, canonical_path: &str) -> PathBuf {
        self.root.join(format!("{}.json", metadata_key(canonical_path)))
    }

    /// Loads the record for a canonical path.
    ///
    /// # Returns
    /// * `Ok(Some(record))` - Record found
    /// * `Ok(None)` - No record, or the stored file is corrupt (logged)
    ///
    /// # Errors
    ///
    /// Returns an error only if an existing file cannot be read.
    pub fn load(&self, canonical_path: &str) -> Result<Option<MetadataRecord>> {
        let path = self.record_path(canonical_path);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::io(
                    format!("reading metadata for {canonical_path}"),
                    e,
                ));
            },
        };

        match serde_json::from_str(&content) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(
                    path = %canonical_path,
                    file = %path.display(),
                    error = %e,
                    "Ignoring corrupt metadata record"
                );
                Ok(None)
            },
        }
    }

    /// Merges `update` into the record for `canonical_path` and persists it.
    ///
    /// A missing record is synthesized from the derivative on disk first.
    /// Provided fields overwrite (including empty values); omitted fields keep
    /// their prior value. `updated_at` is stamped on every call.
    ///
    /// # Errors
    ///
    /// Returns an error if the merged record cannot be written.
    pub fn save(&self, canonical_path: &str, update: MetadataUpdate) -> Result<MetadataRecord> {
        let mut record = match self.load(canonical_path)? {
            Some(record) => record,
            None => self.synthesize(canonical_path),
        };

        record.apply(update);
        record.updated_at = Utc::now();
        self.insert(&record)?;

        Ok(record)
    }

    /// Persists a fully-formed record under its own `relative_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the atomic write fails.
    pub fn insert(&self, record: &MetadataRecord) -> Result<()> {
        let path = self.record_path(&record.relative_path);
        let json = serde_json::to_vec_pretty(record)
            .map_err(|e| Error::json(format!("serializing metadata for {}", record.relative_path), e))?;

        let context = || format!("writing metadata for {}", record.relative_path);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root).map_err(|e| Error::io(context(), e))?;
        tmp.write_all(&json).map_err(|e| Error::io(context(), e))?;
        tmp.persist(&path).map_err(|e| Error::io(context(), e.error))?;

        debug!(path = %record.relative_path, "Saved metadata record");
        Ok(())
    }

    /// Loads a record, creating and persisting one if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be read or written.
    pub fn load_or_init(&self, canonical_path: &str) -> Result<MetadataRecord> {
        if let Some(record) = self.load(canonical_path)? {
            return Ok(record);
        }

        let record = self.synthesize(canonical_path);
        self.insert(&record)?;
        Ok(record)
    }

    /// Moves a record to a new canonical path after its file was renamed.
    ///
    /// # Returns
    /// * `Ok(Some(record))` - The relocated record
    /// * `Ok(None)` - No record existed at `old_path` (nothing to move)
    ///
    /// # Errors
    ///
    /// Returns an error if the new record cannot be written or the old one
    /// cannot be removed.
    pub fn relocate(
        &self,
        old_path: &str,
        new_path: &str,
        new_filename: &str,
    ) -> Result<Option<MetadataRecord>> {
        let Some(mut record) = self.load(old_path)? else {
            return Ok(None);
        };

        record.relocate_to(new_path, new_filename);
        record.updated_at = Utc::now();
        self.insert(&record)?;

        if metadata_key(old_path) != metadata_key(new_path) {
            self.remove(old_path)?;
        }

        Ok(Some(record))
    }

    /// Deletes the record for a canonical path.
    ///
    /// Returns `Ok(true)` if a record existed. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing record file cannot be deleted.
    pub fn remove(&self, canonical_path: &str) -> Result<bool> {
        match fs::remove_file(self.record_path(canonical_path)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(
                format!("removing metadata for {canonical_path}"),
                e,
            )),
        }
    }

    /// Lists every stored record, sorted by relative path.
    ///
    /// Unreadable or corrupt files are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata directory cannot be read.
    pub fn records(&self) -> Result<Vec<MetadataRecord>> {
        let entries = fs::read_dir(&self.root)
            .map_err(|e| Error::io(format!("reading {}", self.root.display()), e))?;

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }

            let parsed = fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|s| serde_json::from_str::<MetadataRecord>(&s).map_err(|e| e.to_string()));
            match parsed {
                Ok(record) => records.push(record),
                Err(e) => warn!(file = %path.display(), error = %e, "Skipping unreadable metadata record"),
            }
        }

        records.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(records)
    }

    /// Builds a record from the files on disk, degrading to a minimal record.
    fn synthesize(&self, canonical_path: &str) -> MetadataRecord {
        let derivative = match resolve_asset_path(canonical_path, &self.derivative_root) {
            Ok(resolved) => resolved.into_absolute(),
            Err(e) => {
                warn!(path = %canonical_path, reason = %e, "Cannot resolve derivative for metadata");
                return MetadataRecord::minimal(canonical_path);
            },
        };

        match extract::extract_technical(&derivative, &self.archive_root, canonical_path) {
            Ok(info) => MetadataRecord::from_technical(canonical_path, info),
            Err(e) => {
                warn!(path = %canonical_path, error = %e, "Falling back to minimal metadata record");
                MetadataRecord::minimal(canonical_path)
            },
        }
    }
}
