use async_trait::async_trait;
use moka::{future::Cache, Expiry};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

/// Failures reported by a [`CacheStore`] backend.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheStoreError {
    /// The backend could not be reached or refused the operation.
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    /// A stored value exists but cannot be read back. Callers purge the key.
    #[error("corrupted cache entry: {0}")]
    Corrupted(String),
}

/// Asynchronous key/value store with per-entry expiry.
///
/// Both the response cache and the contract classifier persist through this trait, so a
/// shared or remote backend can replace [`MemoryStore`] without touching either component.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the stored text, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheStoreError>;

    /// Stores `value` under `key`, replacing any previous entry, for `ttl`.
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheStoreError>;

    /// Removes `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheStoreError>;
}

#[derive(Debug, Clone)]
struct StoredValue {
    text: Arc<str>,
    ttl: Duration,
}

/// Expires each entry after its own TTL, restarting on overwrite.
struct PerEntryTtl;

impl Expiry<String, StoredValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process [`CacheStore`] backed by a bounded `moka` cache.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Cache<String, StoredValue>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(max_entries: u64) -> Self {
        let entries = Cache::builder().max_capacity(max_entries).expire_after(PerEntryTtl).build();
        Self { entries }
    }

    /// Approximate number of live entries.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheStoreError> {
        Ok(self.entries.get(key).await.map(|v| v.text.to_string()))
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheStoreError> {
        self.entries.insert(key.to_string(), StoredValue { text: Arc::from(value), ttl }).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheStoreError> {
        self.entries.invalidate(key).await;
        Ok(())
    }
}
