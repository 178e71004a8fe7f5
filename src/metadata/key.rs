//! Metadata key derivation.

/// Derive the storage key for a canonical relative path.
///
/// The key is the first 128 bits of the BLAKE3 hash of the path, as 32
/// lowercase hex characters: deterministic, filesystem-safe, and
/// collision-resistant for any realistic asset tree.
#[must_use]
pub fn metadata_key(canonical_path: &str) -> String {
    let hash = blake3::hash(canonical_path.as_bytes());
    hex::encode(&hash.as_bytes()[..16])
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_key_is_stable() {
        assert_eq!(
            metadata_key("2025/10/31/photo.webp"),
            metadata_key("2025/10/31/photo.webp")
        );
        assert_ne!(
            metadata_key("2025/10/31/photo.webp"),
            metadata_key("2025/10/31/photo.jpg")
        );
    }

    #[test]
    fn test_unsafe_characters_never_leak_into_key() {
        let key = metadata_key("2025/10/31/we!rd name?.webp");
        assert_eq!(key.len(), 32);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    proptest! {
        /// Invariant: the key format is fixed regardless of input.
        #[test]
        fn key_format_consistent(path in ".{1,200}") {
            let key = metadata_key(&path);
            prop_assert_eq!(key.len(), 32);
            prop_assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        }

        /// Invariant: distinct paths map to distinct keys.
        #[test]
        fn distinct_paths_distinct_keys(paths in prop::collection::hash_set("[a-z0-9/._-]{1,40}", 1..64)) {
            let keys: HashSet<String> = paths.iter().map(|p| metadata_key(p)).collect();
            prop_assert_eq!(keys.len(), paths.len());
        }
    }
}
