use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::future::Future;

struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

/// Concurrent string-keyed cache whose entries expire `ttl_secs` after insertion.
pub struct TtlCache<T> {
    entries: DashMap<String, CacheEntry<T>>,
    ttl_secs: i64,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
        }
    }

    pub fn get(&self, key: &str) -> Option<T> {
        let entry = self.entries.get(key)?;
        let age = (Utc::now() - entry.cached_at).num_seconds();
        if age < self.ttl_secs {
            Some(entry.data.clone())
        } else {
            None
        }
    }

    pub fn insert(&self, key: impl Into<String>, data: T) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                data,
                cached_at: Utc::now(),
            },
        );
    }

    /// Cached value for `key`, or the result of `fetch` (stored only on success).
    pub async fn get_or_try_insert<F, Fut, E>(&self, key: &str, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get(key) {
            tracing::debug!("Cache hit for {}", key);
            return Ok(hit);
        }

        let data = fetch().await?;
        self.insert(key, data.clone());
        Ok(data)
    }

    /// Drop expired entries, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let fresh = (now - entry.cached_at).num_seconds() < self.ttl_secs;
            if !fresh {
                removed += 1;
            }
            fresh
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
