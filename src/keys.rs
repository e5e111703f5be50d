//! Redis key conventions and default TTLs.
//!
//! Key layout:
//!
//! - `cache:<entity>:<id>`: cached payloads (empty string = not-found sentinel)
//! - `lock:<entity>:<id>`: distributed locks (cache rebuild, per-user order)
//! - `seckill:stock:<voucher>`: externally visible stock counter
//! - `seckill:buyers:<voucher>`: per-voucher purchase membership set
//! - `global:id:<key_type>:<day>`: daily id sequence counters

use crate::types::{UserId, VoucherId};
use std::time::Duration;

/// Cached payload prefix for vouchers.
pub const CACHE_VOUCHER: &str = "cache:voucher:";

/// Default TTL for cached payloads.
pub const CACHE_TTL: Duration = Duration::from_secs(10 * 60);

/// TTL for not-found sentinels. Deliberately shorter than [`CACHE_TTL`]:
/// a sentinel only has to absorb penetration, not serve reads.
pub const CACHE_NULL_TTL: Duration = Duration::from_secs(3 * 60);

/// Rebuild-lock prefix for guarded cache reconstruction.
pub const LOCK_VOUCHER_REBUILD: &str = "lock:voucher:";

/// TTL for cache rebuild locks. A safety net against a crashed rebuilder,
/// not the normal release path.
pub const CACHE_REBUILD_LOCK_TTL: Duration = Duration::from_secs(3 * 60);

/// Per-user order lock prefix (lock-based admission strategy).
pub const LOCK_ORDER: &str = "lock:order:";

/// Stock counter prefix.
pub const SECKILL_STOCK: &str = "seckill:stock:";

/// Purchase membership set prefix.
pub const SECKILL_BUYERS: &str = "seckill:buyers:";

/// Id sequence prefix.
pub const ID_SEQUENCE: &str = "global:id:";

/// Cache key for a voucher payload.
#[must_use]
pub fn voucher_cache_key(id: VoucherId) -> String {
    format!("{CACHE_VOUCHER}{id}")
}

/// Rebuild-lock key for a voucher cache entry.
#[must_use]
pub fn voucher_rebuild_lock_key(id: VoucherId) -> String {
    format!("{LOCK_VOUCHER_REBUILD}{id}")
}

/// Per-user order lock key.
#[must_use]
pub fn order_lock_key(user: UserId) -> String {
    format!("{LOCK_ORDER}{user}")
}

/// Stock counter key for a voucher.
#[must_use]
pub fn stock_key(id: VoucherId) -> String {
    format!("{SECKILL_STOCK}{id}")
}

/// Purchase membership set key for a voucher.
#[must_use]
pub fn buyers_key(id: VoucherId) -> String {
    format!("{SECKILL_BUYERS}{id}")
}

/// Daily id sequence key for a namespace.
#[must_use]
pub fn id_sequence_key(key_type: &str, day: i64) -> String {
    format!("{ID_SEQUENCE}{key_type}:{day}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_builders_follow_convention() {
        assert_eq!(voucher_cache_key(VoucherId(7)), "cache:voucher:7");
        assert_eq!(voucher_rebuild_lock_key(VoucherId(7)), "lock:voucher:7");
        assert_eq!(order_lock_key(UserId(42)), "lock:order:42");
        assert_eq!(stock_key(VoucherId(7)), "seckill:stock:7");
        assert_eq!(buyers_key(VoucherId(7)), "seckill:buyers:7");
        assert_eq!(id_sequence_key("voucher-order", 123), "global:id:voucher-order:123");
    }

    #[test]
    fn sentinel_ttl_is_shorter_than_payload_ttl() {
        assert!(CACHE_NULL_TTL < CACHE_TTL);
    }
}
