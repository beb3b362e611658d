//! Response cache used by the data-proxy endpoints.
//!
//! Handlers receive the cache as an `Arc<dyn ResponseCache>` so a shared
//! store can replace the in-process ones when the site runs on several
//! instances.

use crate::config::CacheConfig;
use bytes::Bytes;
use moka::Expiry;
use moka::sync::Cache;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// An upstream response body passed through untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub content_type: String,
    pub body: Bytes,
}

impl Blob {
    pub fn new(content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Blob {
            content_type: content_type.into(),
            body: body.into(),
        }
    }
}

pub trait ResponseCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Blob>;

    fn put(&self, key: String, value: Blob, ttl: Duration);
}

pub fn from_config(config: &CacheConfig) -> Arc<dyn ResponseCache> {
    match config {
        CacheConfig::Memory => Arc::new(MemoryCache::new()),
        CacheConfig::Bounded { max_capacity } => Arc::new(BoundedCache::new(*max_capacity)),
        CacheConfig::Disabled => Arc::new(NoCache),
    }
}

/// Unbounded process-local cache. Expired entries are dropped when read;
/// there is no background eviction.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (Blob, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResponseCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Blob> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            Some((blob, expires_at)) if Instant::now() < *expires_at => Some(blob.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: String, value: Blob, ttl: Duration) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, (value, Instant::now() + ttl));
    }
}

struct PerEntryTtl;

impl Expiry<String, (Blob, Duration)> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &(Blob, Duration),
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.1)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &(Blob, Duration),
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.1)
    }
}

/// Capacity-bounded cache with per-entry TTL.
pub struct BoundedCache {
    cache: Cache<String, (Blob, Duration)>,
}

impl BoundedCache {
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        BoundedCache { cache }
    }
}

impl ResponseCache for BoundedCache {
    fn get(&self, key: &str) -> Option<Blob> {
        self.cache.get(key).map(|(blob, _)| blob)
    }

    fn put(&self, key: String, value: Blob, ttl: Duration) {
        self.cache.insert(key, (value, ttl));
    }
}

pub struct NoCache;

impl ResponseCache for NoCache {
    fn get(&self, _key: &str) -> Option<Blob> {
        None
    }

    fn put(&self, _key: String, _value: Blob, _ttl: Duration) {}
}
