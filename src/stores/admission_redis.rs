//! Redis-backed atomic admission store.
//!
//! The whole admission decision (duplicate check, stock check, stock
//! decrement, membership registration) is one Lua script, so no
//! concurrent caller ever observes an intermediate state. This is what
//! linearizes all stock mutations for a voucher and closes the oversell
//! and duplicate-purchase races.

use crate::error::{Result, SeckillError};
use crate::keys;
use crate::providers::AdmissionStore;
use crate::types::{AdmissionVerdict, UserId, VoucherId};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

/// KEYS[1] = stock counter, KEYS[2] = buyers set, ARGV[1] = user id.
/// Returns 0 = admitted, 1 = sold out, 2 = duplicate.
///
/// Membership is checked before stock so a repeat buyer gets DUPLICATE
/// even after sell-out; re-invocation for an admitted pair never touches
/// stock (idempotence).
const ADMISSION_SCRIPT: &str = r"
    if redis.call('SISMEMBER', KEYS[2], ARGV[1]) == 1 then
        return 2
    end
    if tonumber(redis.call('GET', KEYS[1]) or '0') <= 0 then
        return 1
    end
    redis.call('DECR', KEYS[1])
    redis.call('SADD', KEYS[2], ARGV[1])
    return 0
";

/// Redis admission store.
#[derive(Clone)]
pub struct RedisAdmissionStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisAdmissionStore {
    /// Create a new Redis admission store.
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
        Ok(Self { conn_manager })
    }

    /// Create an admission store over an existing connection manager.
    #[must_use]
    pub const fn with_connection(conn_manager: ConnectionManager) -> Self {
        Self { conn_manager }
    }
}

impl AdmissionStore for RedisAdmissionStore {
    async fn admit(&self, voucher_id: VoucherId, user_id: UserId) -> Result<AdmissionVerdict> {
        let mut conn = self.conn_manager.clone();

        let code: i64 = redis::Script::new(ADMISSION_SCRIPT)
            .key(keys::stock_key(voucher_id))
            .key(keys::buyers_key(voucher_id))
            .arg(user_id.0)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                SeckillError::Store(format!(
                    "Admission script failed for voucher {voucher_id}: {e}"
                ))
            })?;

        let verdict = AdmissionVerdict::from_script_code(code)?;
        tracing::debug!(
            voucher_id = %voucher_id,
            user_id = %user_id,
            verdict = ?verdict,
            "Admission script executed"
        );
        Ok(verdict)
    }

    async fn seed(&self, voucher_id: VoucherId, stock: i64) -> Result<()> {
        let mut conn = self.conn_manager.clone();

        let _: () = conn
            .set(keys::stock_key(voucher_id), stock)
            .await
            .map_err(|e| {
                SeckillError::Store(format!("Failed to seed stock for voucher {voucher_id}: {e}"))
            })?;

        tracing::info!(voucher_id = %voucher_id, stock = stock, "Seeded voucher stock");
        Ok(())
    }

    async fn stock(&self, voucher_id: VoucherId) -> Result<Option<i64>> {
        let mut conn = self.conn_manager.clone();

        let stock: Option<i64> = conn.get(keys::stock_key(voucher_id)).await.map_err(|e| {
            SeckillError::Store(format!("Failed to read stock for voucher {voucher_id}: {e}"))
        })?;

        Ok(stock)
    }
}
