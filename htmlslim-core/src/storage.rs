use crate::cache::{CleanCacheKey, CleanCacheValue};
use crate::error::CleanError;
use anyhow::Result;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Storage abstraction for caching cleaning results
pub trait CleanStorage: Send + Sync {
    fn get_cleaned(&self, cache_key: &CleanCacheKey) -> Result<Option<CleanCacheValue>>;
    fn store_cleaned(&self, cache_key: &CleanCacheKey, cache_value: &CleanCacheValue)
        -> Result<()>;
}

/// File-based storage implementation using local cache directory
pub struct FileStorage {
    cache_dir: PathBuf,
}

impl FileStorage {
    pub fn new(cache_dir: impl AsRef<Path>) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        fs::create_dir_all(cache_dir.join("cleaned"))?;
        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn cleaned_path(&self, cache_key: &CleanCacheKey) -> PathBuf {
        self.cache_dir
            .join("cleaned")
            .join(format!("{}.json", cache_key.to_cache_hash()))
    }
}

impl CleanStorage for FileStorage {
    fn get_cleaned(&self, cache_key: &CleanCacheKey) -> Result<Option<CleanCacheValue>> {
        let path = self.cleaned_path(cache_key);
        if !path.exists() {
            return Ok(None);
        }
        let json_str = fs::read_to_string(path)?;
        let cache_value: CleanCacheValue = serde_json::from_str(&json_str).map_err(|e| {
            CleanError::Cache(format!("Failed to deserialize cached CleanCacheValue: {e}"))
        })?;
        Ok(Some(cache_value))
    }

    fn store_cleaned(
        &self,
        cache_key: &CleanCacheKey,
        cache_value: &CleanCacheValue,
    ) -> Result<()> {
        let path = self.cleaned_path(cache_key);
        let json_str = serde_json::to_string_pretty(cache_value)
            .map_err(|e| CleanError::Cache(format!("Failed to serialize CleanCacheValue: {e}")))?;
        fs::write(path, json_str)?;
        Ok(())
    }
}

/// Calculate hash for configuration data (for the cache key)
pub fn calculate_config_hash<T: serde::Serialize>(config: &T) -> Result<String> {
    let config_json = serde_json::to_string(config)
        .map_err(|e| CleanError::Cache(format!("Failed to serialize config for hashing: {e}")))?;

    let mut hasher = Sha256::new();
    hasher.update(config_json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Calculate hash for the input HTML (for the cache key)
pub fn calculate_html_hash(html: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(html.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// No-op storage implementation that disables all caching
pub struct NoOpStorage;

impl Default for NoOpStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl NoOpStorage {
    pub fn new() -> Self {
        Self
    }
}

impl CleanStorage for NoOpStorage {
    fn get_cleaned(&self, _cache_key: &CleanCacheKey) -> Result<Option<CleanCacheValue>> {
        Ok(None) // Always cache miss
    }

    fn store_cleaned(
        &self,
        _cache_key: &CleanCacheKey,
        _cache_value: &CleanCacheValue,
    ) -> Result<()> {
        Ok(()) // No-op
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::analyze_cleaning;
    use crate::config::CleaningConfig;

    fn sample_key(html: &str, config: &CleaningConfig) -> CleanCacheKey {
        CleanCacheKey::new(
            calculate_html_hash(html),
            calculate_config_hash(config).unwrap(),
        )
    }

    #[test]
    fn test_html_hash_consistency() {
        assert_eq!(calculate_html_hash("<p>a</p>"), calculate_html_hash("<p>a</p>"));
        assert_ne!(calculate_html_hash("<p>a</p>"), calculate_html_hash("<p>b</p>"));
    }

    #[test]
    fn test_config_changes_the_key() {
        let generic = sample_key("<p>a</p>", &CleaningConfig::generic());
        let word = sample_key("<p>a</p>", &CleaningConfig::word());
        assert_ne!(generic.to_cache_hash(), word.to_cache_hash());
    }

    #[test]
    fn test_file_storage_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(temp_dir.path()).unwrap();
        let key = sample_key("<div><p>a</p></div>", &CleaningConfig::generic());

        assert!(storage.get_cleaned(&key).unwrap().is_none());

        let report = analyze_cleaning("<div><p>a</p></div>", "<p>a</p>");
        let value = CleanCacheValue::new("<p>a</p>".to_string(), 0, report.clone(), 3);
        storage.store_cleaned(&key, &value).unwrap();

        let cached = storage.get_cleaned(&key).unwrap().unwrap();
        assert_eq!(cached.html, "<p>a</p>");
        assert_eq!(cached.report, report);
        assert!(temp_dir.path().join("cleaned").is_dir());
    }

    #[test]
    fn test_corrupt_entry_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(temp_dir.path()).unwrap();
        let key = sample_key("x", &CleaningConfig::generic());
        fs::write(storage.cleaned_path(&key), "{not json").unwrap();

        let err = storage.get_cleaned(&key).unwrap_err();
        assert!(err.downcast_ref::<CleanError>().is_some());
    }

    #[test]
    fn test_noop_storage_never_hits() {
        let storage = NoOpStorage::new();
        let key = sample_key("x", &CleaningConfig::generic());
        let value = CleanCacheValue::new(
            "x".to_string(),
            0,
            analyze_cleaning("x", "x"),
            0,
        );
        storage.store_cleaned(&key, &value).unwrap();
        assert!(storage.get_cleaned(&key).unwrap().is_none());
    }
}
