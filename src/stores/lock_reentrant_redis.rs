//! Reentrant distributed lock on Redis with TTL renewal.
//!
//! The lock is a Redis hash `key → { owner: hold_count }`. Acquire and
//! release are Lua scripts, so the ownership check and the counter
//! mutation never interleave with another client's. While any hold is
//! outstanding the client runs a watchdog task that renews the TTL every
//! third of the TTL, so long critical sections are not interrupted by
//! expiry; the TTL only fires if the holder crashes.

use crate::error::{Result, SeckillError};
use crate::providers::DistributedLock;
use redis::aio::ConnectionManager;
use redis::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// KEYS[1] = lock key, ARGV[1] = owner, ARGV[2] = ttl ms.
/// Returns the new hold count, or 0 if the key is owned by someone else.
const ACQUIRE_SCRIPT: &str = r"
    if redis.call('EXISTS', KEYS[1]) == 0 or redis.call('HEXISTS', KEYS[1], ARGV[1]) == 1 then
        local count = redis.call('HINCRBY', KEYS[1], ARGV[1], 1)
        redis.call('PEXPIRE', KEYS[1], ARGV[2])
        return count
    end
    return 0
";

/// KEYS[1] = lock key, ARGV[1] = owner, ARGV[2] = ttl ms.
/// Returns remaining hold count, or -1 if the owner holds nothing.
const RELEASE_SCRIPT: &str = r"
    if redis.call('HEXISTS', KEYS[1], ARGV[1]) == 0 then
        return -1
    end
    local count = redis.call('HINCRBY', KEYS[1], ARGV[1], -1)
    if count > 0 then
        redis.call('PEXPIRE', KEYS[1], ARGV[2])
        return count
    end
    redis.call('DEL', KEYS[1])
    return 0
";

/// KEYS[1] = lock key, ARGV[1] = owner, ARGV[2] = ttl ms.
/// Renews only while this owner still holds the lock.
const RENEW_SCRIPT: &str = r"
    if redis.call('HEXISTS', KEYS[1], ARGV[1]) == 1 then
        return redis.call('PEXPIRE', KEYS[1], ARGV[2])
    end
    return 0
";

/// TTL assumed on release when the acquire-time TTL is unknown (release
/// of a key this instance never acquired).
const DEFAULT_TTL_MS: u64 = 30_000;

/// Reentrant Redis lock client with watchdog renewal.
///
/// Reentrancy is per client instance: the same instance may re-acquire a
/// key it already holds, and must release once per acquire.
pub struct RedisReentrantLock {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
    /// Owner field written into the lock hash.
    owner: String,
    /// Watchdog task and TTL (ms) for each key held by this instance.
    watchdogs: Arc<Mutex<HashMap<String, (JoinHandle<()>, u64)>>>,
}

impl RedisReentrantLock {
    /// Create a new reentrant lock client.
    ///
    /// # Errors
    ///
    /// Returns error if connection to Redis fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| SeckillError::Store(format!("Failed to create Redis client: {e}")))?;
        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            SeckillError::Store(format!("Failed to create Redis connection manager: {e}"))
        })?;
        Ok(Self::with_connection(conn_manager))
    }

    /// Create a reentrant lock client over an existing connection manager.
    #[must_use]
    pub fn with_connection(conn_manager: ConnectionManager) -> Self {
        Self {
            conn_manager,
            owner: Uuid::new_v4().to_string(),
            watchdogs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn start_watchdog(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut watchdogs = self
            .watchdogs
            .lock()
            .map_err(|_| SeckillError::Store("watchdog table poisoned".to_string()))?;
        if watchdogs.contains_key(key) {
            return Ok(());
        }

        let mut conn = self.conn_manager.clone();
        let owner = self.owner.clone();
        let watched_key = key.to_string();
        #[allow(clippy::cast_possible_truncation)]
        let ttl_ms = ttl.as_millis().max(3) as u64;
        let period = Duration::from_millis(ttl_ms / 3);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                let renewed: i64 = match redis::Script::new(RENEW_SCRIPT)
                    .key(&watched_key)
                    .arg(&owner)
                    .arg(ttl_ms)
                    .invoke_async(&mut conn)
                    .await
                {
                    Ok(n) => n,
                    Err(e) => {
                        tracing::warn!(key = %watched_key, error = %e, "Lock renewal failed");
                        continue;
                    }
                };
                if renewed == 0 {
                    // Lost the lock (crash recovery elsewhere or manual del).
                    tracing::warn!(key = %watched_key, "Watchdog found lock no longer held");
                    break;
                }
            }
        });

        watchdogs.insert(key.to_string(), (handle, ttl_ms));
        Ok(())
    }

    fn stop_watchdog(&self, key: &str) -> Result<()> {
        let entry = self
            .watchdogs
            .lock()
            .map_err(|_| SeckillError::Store("watchdog table poisoned".to_string()))?
            .remove(key);
        if let Some((handle, _)) = entry {
            handle.abort();
        }
        Ok(())
    }

    fn held_ttl_ms(&self, key: &str) -> Result<u64> {
        Ok(self
            .watchdogs
            .lock()
            .map_err(|_| SeckillError::Store("watchdog table poisoned".to_string()))?
            .get(key)
            .map_or(DEFAULT_TTL_MS, |(_, ttl)| *ttl))
    }
}

impl Drop for RedisReentrantLock {
    fn drop(&mut self) {
        if let Ok(mut watchdogs) = self.watchdogs.lock() {
            for (_, (handle, _)) in watchdogs.drain() {
                handle.abort();
            }
        }
    }
}

impl DistributedLock for RedisReentrantLock {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn_manager.clone();
        #[allow(clippy::cast_possible_truncation)]
        let ttl_ms = ttl.as_millis().max(1) as u64;

        let count: i64 = redis::Script::new(ACQUIRE_SCRIPT)
            .key(key)
            .arg(&self.owner)
            .arg(ttl_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| SeckillError::Store(format!("Failed to acquire lock {key}: {e}")))?;

        if count == 0 {
            return Ok(false);
        }
        if count == 1 {
            self.start_watchdog(key, ttl)?;
        }
        tracing::debug!(key = %key, hold_count = count, "Acquired reentrant lock");
        Ok(true)
    }

    async fn release(&self, key: &str) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        // Partial release re-arms the TTL so the outer section stays held.
        let ttl_ms = self.held_ttl_ms(key)?;

        let remaining: i64 = redis::Script::new(RELEASE_SCRIPT)
            .key(key)
            .arg(&self.owner)
            .arg(ttl_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| SeckillError::Store(format!("Failed to release lock {key}: {e}")))?;

        match remaining {
            -1 => {
                tracing::warn!(key = %key, "Release of a lock this instance does not hold");
                self.stop_watchdog(key)?;
            }
            0 => {
                self.stop_watchdog(key)?;
                tracing::debug!(key = %key, "Released reentrant lock");
            }
            n => {
                tracing::debug!(key = %key, hold_count = n, "Partial release of reentrant lock");
            }
        }
        Ok(())
    }
}
