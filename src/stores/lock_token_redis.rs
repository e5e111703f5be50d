//! Token-based distributed lock on Redis.
//!
//! Acquire is a conditional set (`SET key token NX PX ttl`); release is a
//! Lua compare-and-delete that removes the key only while it still holds
//! this client's token. The compare and the delete execute as one atomic
//! unit on the server, so a lock that expired and was re-acquired by a
//! different holder is never released by the stale one.

use crate::error::{Result, SeckillError};
use crate::providers::DistributedLock;
use redis::aio::ConnectionManager;
use redis::Client;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

/// Compare-and-delete release. KEYS[1] = lock key, ARGV[1] = owner token.
const RELEASE_SCRIPT: &str = r"
    if redis.call('GET', KEYS[1]) == ARGV[1] then
        return redis.call('DEL', KEYS[1])
    end
    return 0
";

/// Redis token lock client.
///
/// One instance may hold many keys at once; the owner token for each held
/// key is minted at acquire time and combines the instance id with fresh
/// entropy, so it is unique per (process instance, acquisition). The lock
/// is not reentrant: a key this instance holds and has not yet released
/// reports contention to its own tasks too, so at most one token per key
/// is ever outstanding per instance.
pub struct RedisTokenLock {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
    /// Identity of this client instance, part of every owner token.
    instance_id: Uuid,
    /// Tokens for keys currently held by this instance.
    held: Mutex<HashMap<String, String>>,
}

impl RedisTokenLock {
    /// Create a new token lock client.
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

    /// Create a token lock client over an existing connection manager.
    #[must_use]
    pub fn with_connection(conn_manager: ConnectionManager) -> Self {
        Self {
            conn_manager,
            instance_id: Uuid::new_v4(),
            held: Mutex::new(HashMap::new()),
        }
    }

    fn mint_token(&self) -> String {
        format!("{}-{}", self.instance_id, rand::random::<u64>())
    }

    fn holds(&self, key: &str) -> Result<bool> {
        Ok(self
            .held
            .lock()
            .map_err(|_| SeckillError::Store("lock token table poisoned".to_string()))?
            .contains_key(key))
    }

    fn remember(&self, key: &str, token: String) -> Result<()> {
        self.held
            .lock()
            .map_err(|_| SeckillError::Store("lock token table poisoned".to_string()))?
            .insert(key.to_string(), token);
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .held
            .lock()
            .map_err(|_| SeckillError::Store("lock token table poisoned".to_string()))?
            .remove(key))
    }
}

impl DistributedLock for RedisTokenLock {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<bool> {
        // A key this instance already believes it holds is contention,
        // even if the TTL has expired server-side: re-acquiring would
        // overwrite the stored token, and the first holder's release
        // would then compare-and-delete the second holder's live lock.
        if self.holds(key)? {
            return Ok(false);
        }

        let mut conn = self.conn_manager.clone();
        let token = self.mint_token();

        #[allow(clippy::cast_possible_truncation)]
        let ttl_ms = ttl.as_millis().max(1) as u64;

        // SET NX PX: value written only if the key is absent.
        let acquired: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(&token)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| SeckillError::Store(format!("Failed to acquire lock {key}: {e}")))?;

        if acquired.is_some() {
            self.remember(key, token)?;
            tracing::debug!(key = %key, ttl_ms = ttl_ms, "Acquired token lock");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn release(&self, key: &str) -> Result<()> {
        let Some(token) = self.forget(key)? else {
            tracing::warn!(key = %key, "Release of a lock this instance does not hold");
            return Ok(());
        };

        let mut conn = self.conn_manager.clone();
        let deleted: i64 = redis::Script::new(RELEASE_SCRIPT)
            .key(key)
            .arg(&token)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| SeckillError::Store(format!("Failed to release lock {key}: {e}")))?;

        if deleted == 0 {
            // TTL expired and somebody else holds the key now; the
            // compare-and-delete correctly refused to touch it.
            tracing::warn!(key = %key, "Lock expired before release");
        } else {
            tracing::debug!(key = %key, "Released token lock");
        }
        Ok(())
    }
}
