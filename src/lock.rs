//! Lock strategy selection.
//!
//! Both strategies satisfy [`DistributedLock`]; deployments pick one
//! through [`LockConfig::strategy`]. The token lock is the default:
//! cheap, non-reentrant, TTL-bounded. The reentrant lock adds ownership
//! counting and watchdog renewal for critical sections whose duration
//! is not known up front.

use crate::config::{LockConfig, LockStrategy};
use crate::error::Result;
use crate::providers::DistributedLock;
use crate::stores::{RedisReentrantLock, RedisTokenLock};
use redis::aio::ConnectionManager;
use std::time::Duration;

/// A distributed lock client of the configured strategy.
pub enum LockClient {
    /// SET NX + compare-and-delete token lock.
    Token(RedisTokenLock),
    /// Hash-based reentrant lock with watchdog renewal.
    Reentrant(RedisReentrantLock),
}

impl LockClient {
    /// Connect a lock client of the strategy named in `config`.
    ///
    /// # Errors
    ///
    /// Returns error if connection to Redis fails.
    pub async fn connect(redis_url: &str, config: &LockConfig) -> Result<Self> {
        Ok(match config.strategy {
            LockStrategy::Token => Self::Token(RedisTokenLock::new(redis_url).await?),
            LockStrategy::Reentrant => Self::Reentrant(RedisReentrantLock::new(redis_url).await?),
        })
    }

    /// Build a lock client over an existing connection manager.
    #[must_use]
    pub fn with_connection(conn_manager: ConnectionManager, config: &LockConfig) -> Self {
        match config.strategy {
            LockStrategy::Token => Self::Token(RedisTokenLock::with_connection(conn_manager)),
            LockStrategy::Reentrant => {
                Self::Reentrant(RedisReentrantLock::with_connection(conn_manager))
            }
        }
    }
}

impl DistributedLock for LockClient {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<bool> {
        match self {
            Self::Token(lock) => lock.try_acquire(key, ttl).await,
            Self::Reentrant(lock) => lock.try_acquire(key, ttl).await,
        }
    }

    async fn release(&self, key: &str) -> Result<()> {
        match self {
            Self::Token(lock) => lock.release(key).await,
            Self::Reentrant(lock) => lock.release(key).await,
        }
    }
}
