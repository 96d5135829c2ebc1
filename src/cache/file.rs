// Durable cache store backed by the filesystem.
// One JSON file per entry, written atomically, survives process restarts.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::Result;

use super::key::CacheKey;
use super::paths;
use super::store::{CacheEntry, CacheStore};

/// Cache store writing entries under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Store under the XDG cache directory.
    /// Returns `None` if the cache directory cannot be determined.
    pub fn new() -> Option<Self> {
        paths::cache_dir().map(|root| Self::with_dir(paths::responses_dir(&root)))
    }

    /// Store under a specific directory (created lazily on first write).
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(paths::entry_file_name(key))
    }

    fn read_entry(path: &Path) -> Result<Option<CacheEntry>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path)?;
        let entry: CacheEntry = serde_json::from_str(&contents)?;
        Ok(Some(entry))
    }

    fn write_entry(&self, entry: &CacheEntry) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let path = self.entry_path(&entry.key);
        let json = serde_json::to_string(entry)?;

        // Write atomically via a temp file unique to this save
        let mut file = NamedTempFile::new_in(&self.dir)?;
        file.write_all(json.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&path).map_err(|err| err.error)?;

        Ok(())
    }

    fn delete(path: &Path) -> Result<()> {
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn entry_files(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for dir_entry in fs::read_dir(&self.dir)? {
            let path = dir_entry?.path();
            if paths::is_entry_file(&path) {
                files.push(path);
            }
        }
        Ok(files)
    }
}

impl CacheStore for FileStore {
    fn load(&self, key: &CacheKey) -> Option<CacheEntry> {
        let path = self.entry_path(key);
        match Self::read_entry(&path) {
            Ok(Some(entry)) if entry.key == *key => Some(entry),
            Ok(Some(entry)) => {
                debug!(wanted = %key, found = %entry.key, "cache file belongs to another key");
                None
            }
            Ok(None) => None,
            Err(err) => {
                warn!(key = %key, error = %err, "discarding unreadable cache entry");
                if let Err(err) = Self::delete(&path) {
                    warn!(path = %path.display(), error = %err, "failed to delete cache entry");
                }
                None
            }
        }
    }

    fn save(&self, entry: CacheEntry) {
        if let Err(err) = self.write_entry(&entry) {
            warn!(key = %entry.key, error = %err, "failed to write cache entry");
        }
    }

    fn remove(&self, key: &CacheKey) {
        let path = self.entry_path(key);
        // Only remove the file if it holds this key.
        if let Ok(Some(entry)) = Self::read_entry(&path) {
            if entry.key != *key {
                return;
            }
        }
        if let Err(err) = Self::delete(&path) {
            warn!(key = %key, error = %err, "failed to delete cache entry");
        }
    }

    fn clear(&self) {
        match self.entry_files() {
            Ok(files) => {
                for path in files {
                    if let Err(err) = Self::delete(&path) {
                        warn!(path = %path.display(), error = %err, "failed to delete cache entry");
                    }
                }
            }
            Err(err) => warn!(dir = %self.dir.display(), error = %err, "failed to clear cache"),
        }
    }

    fn len(&self) -> usize {
        self.entry_files().map(|files| files.len()).unwrap_or(0)
    }
}
