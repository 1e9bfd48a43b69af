//! File-based page cache with TTL support.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use super::{PageKind, PageSource};
use crate::race::RaceConfig;

/// Cache entry with timestamp
#[derive(Serialize, Deserialize)]
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

/// File-based cache, one directory per page kind
pub struct Cache {
    base_dir: PathBuf,
    ttl: Duration,
}

impl Cache {
    /// Create a new cache with the given base directory
    pub fn new(base_dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            base_dir: base_dir.into(),
            ttl,
        }
    }

    /// Get cache file path for a key
    fn cache_path(&self, kind: PageKind, key: &str) -> PathBuf {
        self.base_dir
            .join(kind.file_stem())
            .join(format!("{}.json", key))
    }

    /// Get cached data if valid
    pub fn get<T: DeserializeOwned>(&self, kind: PageKind, key: &str) -> Option<T> {
        let path = self.cache_path(kind, key);

        if !path.exists() {
            return None;
        }

        let content = std::fs::read_to_string(&path).ok()?;
        let entry: CacheEntry<T> = serde_json::from_str(&content).ok()?;

        // Check if expired
        if Utc::now() - entry.cached_at > self.ttl {
            let _ = std::fs::remove_file(&path);
            return None;
        }

        Some(entry.data)
    }

    /// Set cache data
    pub fn set<T: Serialize>(&self, kind: PageKind, key: &str, data: &T) -> Result<()> {
        let path = self.cache_path(kind, key);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let entry = CacheEntry {
            data,
            cached_at: Utc::now(),
        };

        std::fs::write(&path, serde_json::to_string(&entry)?)?;

        Ok(())
    }
}

/// Page source that serves fresh cache entries and stores new fetches.
pub struct CachedSource<S> {
    inner: S,
    cache: Cache,
}

impl<S: PageSource> CachedSource<S> {
    pub fn new(inner: S, cache: Cache) -> Self {
        Self { inner, cache }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S: PageSource> PageSource for CachedSource<S> {
    async fn fetch(&self, kind: PageKind, config: &RaceConfig, race_num: u8) -> Result<String> {
        let key = config.race_id(race_num);

        if let Some(html) = self.cache.get::<String>(kind, &key) {
            debug!("Cache hit: {} {}", kind, key);
            return Ok(html);
        }

        let html = self.inner.fetch(kind, config, race_num).await?;
        if let Err(e) = self.cache.set(kind, &key, &html) {
            debug!("Failed to cache {} {}: {}", kind, key, e);
        }
        Ok(html)
    }
}
