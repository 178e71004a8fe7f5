//! Result types returned by pipeline operations.

use bytes::Bytes;
use serde::Serialize;

use crate::error::Error;
use crate::metadata::MetadataRecord;
use crate::transcode::OptimizeReport;

/// An item of a batch operation that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// Path or filename as supplied by the caller
    pub item: String,
    /// HTTP-style status for the failure
    pub status: u16,
    pub message: String,
}

impl ItemFailure {
    pub(crate) fn new(item: impl Into<String>, error: &Error, dev_mode: bool) -> Self {
        Self {
            item: item.into(),
            status: error.status_code(),
            message: error.public_message(dev_mode),
        }
    }
}

/// Outcome of a rename.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameOutcome {
    pub old_path: String,
    pub new_path: String,
    pub filename: String,
    /// The relocated record, if one existed
    pub record: Option<MetadataRecord>,
}

/// Outcome of a single delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub path: String,
    pub record_removed: bool,
}

/// Outcome of a bulk delete. Items fail independently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkDeleteReport {
    pub deleted: Vec<DeleteOutcome>,
    pub failed: Vec<ItemFailure>,
}

/// Outcome of a multi-file optimize. Files fail independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub succeeded: Vec<OptimizeReport>,
    pub failed: Vec<ItemFailure>,
}

/// Records gathered for external export formatting.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportReport {
    pub records: Vec<MetadataRecord>,
    pub failed: Vec<ItemFailure>,
}

/// Outcome of a metadata/derivative reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Records examined
    pub checked: usize,
    /// Paths whose orphaned records were removed
    pub removed: Vec<String>,
}

/// One uploaded file awaiting optimization.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub data: Bytes,
}

impl Upload {
    pub fn new(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }
}
