//! Derivative tree enumeration.
//!
//! Walks the derivative root recursively, yielding every file with a
//! supported derivative extension. Symlinks are never followed, so a link
//! planted inside the tree cannot expose files outside it.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::constants::DERIVATIVE_EXTENSIONS;
use crate::error::{Error, Result};

/// One derivative found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetEntry {
    /// Canonical relative path (`/` separated)
    pub relative_path: String,
    pub filename: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// Scanner over a derivative root.
#[derive(Debug, Clone)]
pub struct AssetScanner {
    root: PathBuf,
}

impl AssetScanner {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Lists every derivative, sorted by relative path.
    ///
    /// A missing root yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory inside the tree cannot be read.
    pub fn scan(&self) -> Result<Vec<AssetEntry>> {
        let mut entries = Vec::new();
        scan_directory(&self.root, &self.root, &mut entries)?;
        entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(entries)
    }

    /// Finds a derivative by bare filename anywhere in the tree.
    ///
    /// Matching is exact. When several buckets hold the same name, the
    /// lexicographically last (most recent date bucket) wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree cannot be scanned.
    pub fn find_by_filename(&self, filename: &str) -> Result<Option<String>> {
        let found = self
            .scan()?
            .into_iter()
            .filter(|entry| entry.filename == filename)
            .map(|entry| entry.relative_path)
            .next_back();

        debug!(filename = %filename, found = ?found, "Secondary filename lookup");
        Ok(found)
    }
}

fn scan_directory(base_dir: &Path, dir: &Path, entries: &mut Vec<AssetEntry>) -> Result<()> {
    let listing = match fs::read_dir(dir) {
        Ok(listing) => listing,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && dir == base_dir => return Ok(()),
        Err(e) => return Err(Error::io(format!("reading directory {}", dir.display()), e)),
    };

    for entry in listing {
        let entry = entry.map_err(|e| Error::io(format!("reading entry in {}", dir.display()), e))?;
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let path = entry.path();

        if file_type.is_dir() {
            scan_directory(base_dir, &path, entries)?;
            continue;
        }
        if !file_type.is_file() || !has_derivative_extension(&path) {
            continue;
        }

        let Ok(relative) = path.strip_prefix(base_dir) else {
            continue;
        };
        let Ok(meta) = entry.metadata() else {
            continue;
        };

        entries.push(AssetEntry {
            relative_path: relative.to_string_lossy().replace('\\', "/"),
            filename: entry.file_name().to_string_lossy().into_owned(),
            size: meta.len(),
            modified: meta.modified().map_or_else(|_| Utc::now(), DateTime::<Utc>::from),
        });
    }

    Ok(())
}

fn has_derivative_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| {
        let ext = ext.to_string_lossy().to_ascii_lowercase();
        DERIVATIVE_EXTENSIONS.contains(&ext.as_str())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_scan_filters_and_sorts() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "2025/10/31/b.webp");
        touch(tmp.path(), "2025/10/30/a.JPG");
        touch(tmp.path(), "2025/10/31/notes.txt");
        touch(tmp.path(), "2025/10/31/raw.tiff");

        let scanner = AssetScanner::new(tmp.path());
        let paths: Vec<_> = scanner.scan().unwrap().into_iter().map(|e| e.relative_path).collect();
        assert_eq!(paths, vec!["2025/10/30/a.JPG", "2025/10/31/b.webp"]);
    }

    #[test]
    fn test_missing_root_is_empty() {
        let tmp = TempDir::new().unwrap();
        let scanner = AssetScanner::new(tmp.path().join("nope"));
        assert!(scanner.scan().unwrap().is_empty());
    }

    #[test]
    fn test_find_by_filename_prefers_latest_bucket() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "2024/01/01/dup.webp");
        touch(tmp.path(), "2025/06/01/dup.webp");
        touch(tmp.path(), "2025/06/01/other.webp");

        let scanner = AssetScanner::new(tmp.path());
        assert_eq!(
            scanner.find_by_filename("dup.webp").unwrap().as_deref(),
            Some("2025/06/01/dup.webp")
        );
        assert!(scanner.find_by_filename("absent.webp").unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_not_followed() {
        let tmp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        touch(outside.path(), "secret.webp");
        touch(tmp.path(), "2025/01/01/real.webp");
        std::os::unix::fs::symlink(outside.path(), tmp.path().join("2025/link")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret.webp"),
            tmp.path().join("2025/01/01/alias.webp"),
        )
        .unwrap();

        let scanner = AssetScanner::new(tmp.path());
        let paths: Vec<_> = scanner.scan().unwrap().into_iter().map(|e| e.relative_path).collect();
        assert_eq!(paths, vec!["2025/01/01/real.webp"]);
    }
}
