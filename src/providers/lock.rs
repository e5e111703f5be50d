//! Distributed lock trait.

use crate::error::Result;
use std::time::Duration;

/// Mutual exclusion across processes via the fast store.
///
/// # Contract
///
/// - `try_acquire` returning `Ok(false)` signals contention, not an
///   error; callers choose fail-fast or bounded retry.
/// - The TTL is a safety net against a crashed holder, not the normal
///   release path.
/// - No operation blocks indefinitely without a caller-supplied bound.
/// - `release` must never free a lock the caller no longer holds (e.g.
///   one that expired and was re-acquired by somebody else in between).
pub trait DistributedLock: Send + Sync {
    /// Attempt to acquire the lock at `key` with the given TTL.
    ///
    /// # Errors
    ///
    /// Returns error only on store failure. Contention is `Ok(false)`.
    fn try_acquire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Release the lock at `key`, if this holder still owns it.
    ///
    /// Releasing a lock that already expired (or was never acquired by
    /// this holder) is a no-op, logged but not an error.
    ///
    /// # Errors
    ///
    /// Returns error on store failure.
    fn release(&self, key: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}
