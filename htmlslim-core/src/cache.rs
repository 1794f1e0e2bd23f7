use crate::analytics::CleaningReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version constants for cache invalidation
pub mod versions {
    pub const HTMLSLIM_VERSION: &str = env!("CARGO_PKG_VERSION");
    /// Bump whenever pass semantics change the output for the same input
    pub const ENGINE_VERSION: &str = "1.0.0";
}

/// Cache key (input HTML + config → cleaned HTML)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CleanCacheKey {
    pub html_hash: String,
    pub config_hash: String,
    pub htmlslim_version: String,
    pub engine_version: String,
}

impl CleanCacheKey {
    pub fn new(html_hash: String, config_hash: String) -> Self {
        Self {
            html_hash,
            config_hash,
            htmlslim_version: versions::HTMLSLIM_VERSION.to_string(),
            engine_version: versions::ENGINE_VERSION.to_string(),
        }
    }

    /// Compute cache key hash for storage
    pub fn to_cache_hash(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(&self.html_hash);
        hasher.update(&self.config_hash);
        hasher.update(&self.htmlslim_version);
        hasher.update(&self.engine_version);
        format!("{:x}", hasher.finalize())
    }
}

/// Cached cleaning result with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanCacheValue {
    pub html: String,
    pub wrapper_tables_removed: usize,
    pub report: CleaningReport,
    pub created_at: DateTime<Utc>,
    pub processing_time_ms: u64,
    pub cache_version: String,
}

impl CleanCacheValue {
    pub fn new(
        html: String,
        wrapper_tables_removed: usize,
        report: CleaningReport,
        processing_time_ms: u64,
    ) -> Self {
        Self {
            html,
            wrapper_tables_removed,
            report,
            created_at: Utc::now(),
            processing_time_ms,
            cache_version: versions::ENGINE_VERSION.to_string(),
        }
    }
}
