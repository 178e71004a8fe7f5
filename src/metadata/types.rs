//! Metadata record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_KEYWORD_LEN, MAX_KEYWORDS};

/// Persisted metadata for one derivative asset.
///
/// `relative_path` must always match the derivative's current location
/// under the derivative root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    /// Final path segment, e.g. `photo.webp`
    pub filename: String,
    /// Canonical relative path, e.g. `2025/10/31/photo.webp`
    pub relative_path: String,
    /// Archive-relative path of the original upload, if known
    #[serde(default)]
    pub original_path: Option<String>,
    /// Current derivative size in bytes
    #[serde(default)]
    pub file_size: u64,
    /// Original upload size in bytes
    #[serde(default)]
    pub original_size: u64,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    /// Container format, e.g. `webp`
    #[serde(default)]
    pub format: Option<String>,
    /// `srgb` or `b-w`
    #[serde(default)]
    pub color_space: Option<String>,
    #[serde(default)]
    pub has_alpha: bool,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub alt_text: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MetadataRecord {
    /// A record carrying only identity and timestamps.
    ///
    /// Used when technical extraction fails.
    #[must_use]
    pub fn minimal(relative_path: &str) -> Self {
        let now = Utc::now();
        Self {
            filename: filename_of(relative_path).to_string(),
            relative_path: relative_path.to_string(),
            original_path: None,
            file_size: 0,
            original_size: 0,
            width: None,
            height: None,
            format: None,
            color_space: None,
            has_alpha: false,
            title: String::new(),
            alt_text: String::new(),
            caption: String::new(),
            description: String::new(),
            keywords: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Build a record from extracted technical attributes with empty SEO fields.
    #[must_use]
    pub fn from_technical(relative_path: &str, info: TechnicalInfo) -> Self {
        Self {
            original_path: info.original_path,
            file_size: info.file_size,
            original_size: info.original_size,
            width: Some(info.width),
            height: Some(info.height),
            format: info.format,
            color_space: Some(info.color_space),
            has_alpha: info.has_alpha,
            created_at: info.created_at,
            updated_at: info.modified_at,
            ..Self::minimal(relative_path)
        }
    }

    /// Merge an update field by field. Only provided fields overwrite.
    pub fn apply(&mut self, update: MetadataUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(alt_text) = update.alt_text {
            self.alt_text = alt_text;
        }
        if let Some(caption) = update.caption {
            self.caption = caption;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(keywords) = update.keywords {
            self.keywords = normalize_keywords(keywords);
        }
    }

    /// Point the record at a new location after a rename.
    pub fn relocate_to(&mut self, relative_path: &str, filename: &str) {
        self.relative_path = relative_path.to_string();
        self.filename = filename.to_string();
    }
}

/// Partial update for the editable SEO fields.
///
/// `None` preserves the stored value; `Some` (including empty) overwrites it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetadataUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
}

impl MetadataUpdate {
    /// Returns true if no field is provided.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.alt_text.is_none()
            && self.caption.is_none()
            && self.description.is_none()
            && self.keywords.is_none()
    }
}

/// Technical attributes read from a derivative on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TechnicalInfo {
    pub width: u32,
    pub height: u32,
    pub format: Option<String>,
    pub color_space: String,
    pub has_alpha: bool,
    pub file_size: u64,
    pub original_size: u64,
    pub original_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Trim, drop empties, cap each keyword's length and the keyword count.
#[must_use]
pub fn normalize_keywords(keywords: Vec<String>) -> Vec<String> {
    keywords
        .into_iter()
        .map(|k| k.trim().chars().take(MAX_KEYWORD_LEN).collect::<String>())
        .filter(|k| !k.is_empty())
        .take(MAX_KEYWORDS)
        .collect()
}

fn filename_of(relative_path: &str) -> &str {
    relative_path.rsplit('/').next().unwrap_or(relative_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_overwrites_only_provided_fields() {
        let mut record = MetadataRecord::minimal("2025/10/31/a.webp");
        record.title = "Old".into();
        record.caption = "Keep me".into();

        record.apply(MetadataUpdate {
            title: Some("New".into()),
            alt_text: Some(String::new()),
            ..MetadataUpdate::default()
        });

        assert_eq!(record.title, "New");
        assert_eq!(record.alt_text, "");
        assert_eq!(record.caption, "Keep me");
    }

    #[test]
    fn test_empty_keyword_list_clears() {
        let mut record = MetadataRecord::minimal("a.webp");
        record.keywords = vec!["sea".into()];
        record.apply(MetadataUpdate {
            keywords: Some(Vec::new()),
            ..MetadataUpdate::default()
        });
        assert!(record.keywords.is_empty());
    }

    #[test]
    fn test_normalize_keywords_bounds() {
        let mut raw: Vec<String> = (0..30).map(|i| format!(" kw{i} ")).collect();
        raw.insert(0, "   ".into());
        raw.insert(1, "x".repeat(80));

        let normalized = normalize_keywords(raw);
        assert_eq!(normalized.len(), MAX_KEYWORDS);
        assert_eq!(normalized[0].chars().count(), MAX_KEYWORD_LEN);
        assert_eq!(normalized[1], "kw0");
    }

    #[test]
    fn test_record_json_uses_camel_case() {
        let record = MetadataRecord::minimal("2025/10/31/a.webp");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["relativePath"], "2025/10/31/a.webp");
        assert_eq!(json["filename"], "a.webp");
        assert!(json.get("altText").is_some());
        assert!(json.get("updatedAt").is_some());
    }

    #[test]
    fn test_update_deserializes_partial_json() {
        let update: MetadataUpdate = serde_json::from_str(r#"{"title":"Dune","keywords":[]}"#).unwrap();
        assert_eq!(update.title.as_deref(), Some("Dune"));
        assert_eq!(update.keywords, Some(vec![]));
        assert!(update.alt_text.is_none());
        assert!(!update.is_empty());
        assert!(MetadataUpdate::default().is_empty());
    }
}
