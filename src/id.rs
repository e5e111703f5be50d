//! Time-ordered unique id generation.
//!
//! An id is a positive 64-bit value: days elapsed since a fixed epoch
//! (2024-12-01 UTC) in the high bits, a per-(day, namespace) sequence
//! from a Redis `INCR` in the low 32 bits. Ids are strictly increasing
//! within one namespace and day, and coarsely chronological across days.
//! Distinct namespaces share no uniqueness guarantee; callers must not
//! mix them.

use crate::error::{Result, SeckillError};
use crate::keys;
use chrono::{NaiveDate, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

/// Bits reserved for the per-day sequence.
const SEQUENCE_BITS: u32 = 32;

/// First day of the id epoch. Days are counted from here.
fn epoch() -> NaiveDate {
    // Statically valid date; the fallback never fires.
    NaiveDate::from_ymd_opt(2024, 12, 1).unwrap_or_default()
}

/// Redis-backed id generator.
///
/// If the sequence increment fails, id generation fails and the error
/// propagates; a degraded or duplicate id is never returned.
#[derive(Clone)]
pub struct IdGenerator {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl IdGenerator {
    /// Create a new id generator.
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

    /// Create an id generator over an existing connection manager.
    #[must_use]
    pub const fn with_connection(conn_manager: ConnectionManager) -> Self {
        Self { conn_manager }
    }
}

impl crate::providers::IdSource for IdGenerator {
    /// # Errors
    ///
    /// Returns error if the store is unreachable, the clock is before the
    /// epoch, or the day's sequence is exhausted.
    async fn next_id(&self, key_type: &str) -> Result<i64> {
        let day = (Utc::now().date_naive() - epoch()).num_days();
        if day < 0 {
            return Err(SeckillError::Validation(
                "system clock is before the id epoch".to_string(),
            ));
        }

        let mut conn = self.conn_manager.clone();
        let sequence: i64 = conn
            .incr(keys::id_sequence_key(key_type, day), 1_i64)
            .await
            .map_err(|e| {
                SeckillError::Store(format!("Failed to increment id sequence {key_type}: {e}"))
            })?;

        compose(day, sequence)
    }
}

/// Pack day and sequence into one id. Fails rather than overlap bits.
fn compose(day: i64, sequence: i64) -> Result<i64> {
    if sequence <= 0 || sequence > i64::from(u32::MAX) {
        return Err(SeckillError::Store(format!(
            "id sequence exhausted for day {day}: {sequence}"
        )));
    }
    Ok((day << SEQUENCE_BITS) | sequence)
}
