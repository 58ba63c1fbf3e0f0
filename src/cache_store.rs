//! Key-value cache with a TTL per entry.
//!
//! Two backends: Redis, shared between instances and surviving restarts,
//! and an in-process moka cache used when no Redis address is configured.
//! The store knows nothing about Steam resources: keys are strings, values
//! are the JSON text of whatever the caller cached. Callers treat an `Err`
//! from `get` exactly like a miss and an `Err` from `set` as a no-op.

use crate::cache_validator::ValidatedCacheEntry;
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::fmt;
use std::time::{Duration, Instant};

/// Failure talking to the cache backend. Never surfaced to end users.
#[derive(Debug, Clone)]
pub struct CacheError(pub String);

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cache error: {}", self.0)
    }
}

impl std::error::Error for CacheError {}

/// Cache backend capability. Implementations must be safe for concurrent use.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the stored value, or `None` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key` for `ttl`, replacing any previous entry.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
}

#[derive(Clone)]
struct StoredEntry {
    entry: ValidatedCacheEntry,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, StoredEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process cache backed by moka, with checksum-validated entries.
#[derive(Clone)]
pub struct MokaCacheStore {
    cache: Cache<String, StoredEntry>,
}

impl MokaCacheStore {
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }
}

#[async_trait]
impl CacheStore for MokaCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let Some(stored) = self.cache.get(key).await else {
            return Ok(None);
        };

        match stored.entry.into_data() {
            Some(data) => Ok(Some(data)),
            None => {
                tracing::warn!("Dropping corrupted cache entry {}", key);
                self.cache.invalidate(key).await;
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let entry = ValidatedCacheEntry::new(value);
        self.cache
            .insert(key.to_string(), StoredEntry { entry, ttl })
            .await;
        Ok(())
    }
}

/// Shared cache backed by Redis. Values are stored as-is with `SET EX`.
#[derive(Clone)]
pub struct RedisCacheStore {
    conn: ConnectionManager,
}

impl RedisCacheStore {
    /// Connects to `url` and checks the server answers `PING`.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let mut conn = client.get_connection_manager().await?;

        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        Ok(Self { conn })
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError(err.to_string())
    }
}

/// `SET EX` takes whole seconds and rejects 0.
fn expire_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, expire_seconds(ttl)).await?;
        Ok(())
    }
}
