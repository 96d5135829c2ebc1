// Cache path utilities.
// Locates the durable cache directory and names one file per cache key.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use sha2::{Digest, Sha256};

use super::key::CacheKey;

const ENTRY_EXTENSION: &str = "json";

/// Get the base cache directory (~/.cache/storefront-client on Linux).
pub fn cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "storefront-client").map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Path to the responses directory inside a cache root.
pub fn responses_dir(root: &Path) -> PathBuf {
    root.join("responses")
}

/// File name for a cache entry.
///
/// Keys may hold any character and be arbitrarily long, so the file is named
/// by the first 8 bytes of the key's SHA-256. The entry itself records the
/// full key, which readers compare before trusting the file.
pub fn entry_file_name(key: &CacheKey) -> String {
    let digest = Sha256::digest(key.as_str().as_bytes());
    format!("{}.{}", hex::encode(&digest[..8]), ENTRY_EXTENSION)
}

/// Whether a directory entry is a cache entry file.
pub fn is_entry_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Params;

    #[test]
    fn test_entry_file_name_is_sha256_prefix() {
        // A bare endpoint encodes as "/featured?".
        let key = CacheKey::new("/featured", &Params::new());
        let digest = Sha256::digest(b"/featured?");
        assert_eq!(entry_file_name(&key), format!("{}.json", hex::encode(&digest[..8])));

        let other = CacheKey::new("/featured", &Params::new().with("offset", 12));
        assert_ne!(entry_file_name(&key), entry_file_name(&other));
    }

    #[test]
    fn test_entry_file_name_is_stable() {
        let key = CacheKey::new("/featured", &Params::new());
        let name = entry_file_name(&key);
        assert_eq!(name, entry_file_name(&key));
        assert!(name.ends_with(".json"));
        assert_eq!(name.len(), 16 + ".json".len());
    }

    #[test]
    fn test_is_entry_file() {
        assert!(is_entry_file(Path::new("/tmp/0123456789abcdef.json")));
        assert!(!is_entry_file(Path::new("/tmp/0123456789abcdef.tmp")));
    }

    #[test]
    fn test_cache_dir_mentions_project() {
        if let Some(dir) = cache_dir() {
            assert!(dir.to_string_lossy().contains("storefront-client"));
        }
        // Test passes if cache_dir() returns None (e.g., no home directory in CI)
    }
}
