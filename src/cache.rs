//! Cache-aside read layer with penetration and avalanche guards.
//!
//! Values are JSON strings in Redis. A present-but-empty string is the
//! not-found sentinel: it records "the backing store has no such entity"
//! so repeated lookups for a nonexistent key stop at the cache instead of
//! hammering the loader (penetration guard). Sentinels carry a shorter
//! TTL than real payloads.
//!
//! The guarded variant adds avalanche protection: on a miss, callers race
//! for a short-lived per-key rebuild lock; exactly one runs the loader
//! while the rest poll the cache with bounded backoff.

use crate::config::CacheConfig;
use crate::error::{Rejection, Result, SeckillError};
use crate::keys;
use crate::providers::DistributedLock;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// What a cache read found.
enum CacheRead {
    /// A real serialized payload.
    Payload(String),
    /// The not-found sentinel.
    Sentinel,
    /// Nothing cached.
    Miss,
}

/// Read-through cache client over Redis.
#[derive(Clone)]
pub struct CacheAsideClient {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
    /// Backoff/budget tuning for guarded rebuilds.
    config: CacheConfig,
}

impl CacheAsideClient {
    /// Create a new cache client.
    ///
    /// # Errors
    ///
    /// Returns error if connection to Redis fails.
    pub async fn new(redis_url: &str, config: CacheConfig) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| SeckillError::Store(format!("Failed to create Redis client: {e}")))?;
        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            SeckillError::Store(format!("Failed to create Redis connection manager: {e}"))
        })?;
        Ok(Self::with_connection(conn_manager, config))
    }

    /// Create a cache client over an existing connection manager.
    #[must_use]
    pub const fn with_connection(conn_manager: ConnectionManager, config: CacheConfig) -> Self {
        Self {
            conn_manager,
            config,
        }
    }

    /// Serialize and cache a value with the given TTL.
    ///
    /// # Errors
    ///
    /// Returns error on serialization or store failure.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let payload = serde_json::to_string(value)
            .map_err(|e| SeckillError::Serialization(e.to_string()))?;
        let mut conn = self.conn_manager.clone();
        let _: () = conn
            .set_ex(key, payload, ttl.as_secs().max(1))
            .await
            .map_err(|e| SeckillError::Store(format!("Failed to cache {key}: {e}")))?;
        Ok(())
    }

    /// Drop a cached entry. Write paths update the backing store first,
    /// then invalidate, so the next read rebuilds from fresh data.
    ///
    /// # Errors
    ///
    /// Returns error on store failure.
    pub async fn invalidate(&self, key: &str) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let _: () = conn
            .del(key)
            .await
            .map_err(|e| SeckillError::Store(format!("Failed to invalidate {key}: {e}")))?;
        Ok(())
    }

    async fn read_entry(&self, key: &str) -> Result<CacheRead> {
        let mut conn = self.conn_manager.clone();
        let cached: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| SeckillError::Store(format!("Failed to read cache {key}: {e}")))?;
        Ok(match cached {
            Some(s) if s.is_empty() => CacheRead::Sentinel,
            Some(s) => CacheRead::Payload(s),
            None => CacheRead::Miss,
        })
    }

    async fn write_sentinel(&self, key: &str) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let _: () = conn
            .set_ex(key, "", keys::CACHE_NULL_TTL.as_secs().max(1))
            .await
            .map_err(|e| SeckillError::Store(format!("Failed to cache sentinel {key}: {e}")))?;
        Ok(())
    }

    fn decode<T: DeserializeOwned>(key: &str, payload: &str) -> Result<T> {
        serde_json::from_str(payload).map_err(|e| {
            SeckillError::Serialization(format!("Corrupt cache payload at {key}: {e}"))
        })
    }

    /// Read-through get with penetration guard.
    ///
    /// Cache hit → deserialized value, loader not invoked. Sentinel hit →
    /// `Ok(None)`, loader not invoked. Miss → loader runs; its `None`
    /// becomes a short-lived sentinel, its `Some` is cached with `ttl`.
    ///
    /// # Errors
    ///
    /// Returns error on store, serialization, or loader failure.
    pub async fn get_with_passthrough<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        loader: F,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<T>>> + Send,
    {
        match self.read_entry(key).await? {
            CacheRead::Payload(payload) => {
                tracing::debug!(key = %key, "Cache hit");
                Ok(Some(Self::decode(key, &payload)?))
            }
            CacheRead::Sentinel => {
                tracing::debug!(key = %key, "Cache sentinel hit");
                Ok(None)
            }
            CacheRead::Miss => self.rebuild(key, ttl, loader).await,
        }
    }

    /// Read-through get with penetration AND avalanche guards.
    ///
    /// On a miss, callers compete for `lock_key`; the winner double-checks
    /// the cache (another winner may have just populated it), runs the
    /// loader, and releases the lock on every exit path. Losers poll the
    /// cache with fixed backoff and never invoke the loader; if the cache
    /// is still cold when the wait budget runs out they fail with
    /// [`Rejection::Contention`].
    ///
    /// # Errors
    ///
    /// Returns error on store, serialization, or loader failure, or
    /// `Rejected(Contention)` when the wait budget is exhausted.
    pub async fn get_with_rebuild_lock<T, L, F, Fut>(
        &self,
        key: &str,
        lock_key: &str,
        lock: &L,
        ttl: Duration,
        loader: F,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        L: DistributedLock,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<T>>> + Send,
    {
        match self.read_entry(key).await? {
            CacheRead::Payload(payload) => return Ok(Some(Self::decode(key, &payload)?)),
            CacheRead::Sentinel => return Ok(None),
            CacheRead::Miss => {}
        }

        let deadline = Instant::now() + self.config.rebuild_wait_budget();
        loop {
            if lock
                .try_acquire(lock_key, keys::CACHE_REBUILD_LOCK_TTL)
                .await?
            {
                // Double-check: another holder may have rebuilt while we
                // were acquiring.
                let rebuilt = match self.read_entry(key).await {
                    Ok(CacheRead::Payload(payload)) => Self::decode(key, &payload).map(Some),
                    Ok(CacheRead::Sentinel) => Ok(None),
                    Ok(CacheRead::Miss) => self.rebuild(key, ttl, loader).await,
                    Err(e) => Err(e),
                };
                // Release unconditionally, then surface the rebuild result.
                let released = lock.release(lock_key).await;
                let value = rebuilt?;
                released?;
                return Ok(value);
            }

            if Instant::now() >= deadline {
                tracing::warn!(key = %key, "Cache rebuild wait budget exhausted");
                return Err(SeckillError::Rejected(Rejection::Contention));
            }
            tokio::time::sleep(self.config.rebuild_backoff()).await;

            match self.read_entry(key).await? {
                CacheRead::Payload(payload) => return Ok(Some(Self::decode(key, &payload)?)),
                CacheRead::Sentinel => return Ok(None),
                CacheRead::Miss => {}
            }
        }
    }

    /// Miss path: run the loader and cache its answer (payload or sentinel).
    async fn rebuild<T, F, Fut>(&self, key: &str, ttl: Duration, loader: F) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<T>>> + Send,
    {
        tracing::debug!(key = %key, "Cache miss, loading from backing store");
        match loader().await? {
            Some(value) => {
                self.set(key, &value, ttl).await?;
                Ok(Some(value))
            }
            None => {
                self.write_sentinel(key).await?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::mocks::MockLock;
    use crate::stores::RedisTokenLock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    // These tests require a running Redis instance
    // Run with: docker run -d -p 6379:6379 redis:7-alpine

    async fn client() -> CacheAsideClient {
        CacheAsideClient::new("redis://127.0.0.1:6379", CacheConfig {
            rebuild_backoff_ms: 20,
            rebuild_wait_budget_ms: 2000,
        })
        .await
        .unwrap()
    }

    fn unique_key(prefix: &str) -> String {
        format!("cache:test:{prefix}:{}", uuid::Uuid::new_v4())
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn round_trip_before_expiry() {
        let cache = client().await;
        let key = unique_key("roundtrip");

        cache.set(&key, &"hello".to_string(), Duration::from_secs(60)).await.unwrap();
        let got: Option<String> = cache
            .get_with_passthrough(&key, Duration::from_secs(60), || async {
                panic!("loader must not run on a hit")
            })
            .await
            .unwrap();
        assert_eq!(got.as_deref(), Some("hello"));
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn sentinel_suppresses_loader() {
        let cache = client().await;
        let key = unique_key("sentinel");
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let calls = Arc::clone(&calls);
            let got: Option<String> = cache
                .get_with_passthrough(&key, Duration::from_secs(60), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                })
                .await
                .unwrap();
            assert!(got.is_none());
        }
        // First miss loaded and cached the sentinel; the rest stopped there.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn concurrent_misses_run_loader_once() {
        let cache = client().await;
        let lock = Arc::new(RedisTokenLock::new("redis://127.0.0.1:6379").await.unwrap());
        let key = Arc::new(unique_key("avalanche"));
        let lock_key = Arc::new(format!("lock:{key}"));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..10 {
            let cache = cache.clone();
            let lock = Arc::clone(&lock);
            let key = Arc::clone(&key);
            let lock_key = Arc::clone(&lock_key);
            let calls = Arc::clone(&calls);
            tasks.push(tokio::spawn(async move {
                cache
                    .get_with_rebuild_lock(&key, &lock_key, lock.as_ref(), Duration::from_secs(60), move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok(Some("rebuilt".to_string()))
                    })
                    .await
            }));
        }

        for task in tasks {
            let got = task.await.unwrap().unwrap();
            assert_eq!(got.as_deref(), Some("rebuilt"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn stuck_rebuilder_exhausts_wait_budget_with_contention() {
        let cache = CacheAsideClient::new(
            "redis://127.0.0.1:6379",
            CacheConfig {
                rebuild_backoff_ms: 20,
                rebuild_wait_budget_ms: 200,
            },
        )
        .await
        .unwrap();
        let key = unique_key("stuck");
        let lock_key = format!("lock:{key}");

        // Somebody else holds the rebuild lock and never repopulates the
        // cache; this caller must give up at its budget, loader untouched.
        let lock = MockLock::new();
        assert!(lock.try_acquire(&lock_key, Duration::from_secs(60)).await.unwrap());

        let err = cache
            .get_with_rebuild_lock::<String, _, _, _>(
                &key,
                &lock_key,
                &lock,
                Duration::from_secs(60),
                || async { panic!("loader must not run without the rebuild lock") },
            )
            .await
            .unwrap_err();
        assert_eq!(err, SeckillError::Rejected(Rejection::Contention));
        assert!(lock.is_held(&lock_key).unwrap());
    }
}
