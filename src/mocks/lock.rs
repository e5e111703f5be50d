//! Mock distributed lock.

use crate::error::{Result, SeckillError};
use crate::providers::DistributedLock;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock lock: process-local mutual exclusion, no TTL expiry.
///
/// Good enough for engine tests; TTL behavior is covered by the Redis
/// lock tests.
#[derive(Clone, Default)]
pub struct MockLock {
    held: Arc<Mutex<HashSet<String>>>,
}

impl MockLock {
    /// Create an empty mock lock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a key is currently held (for assertions).
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned.
    pub fn is_held(&self, key: &str) -> Result<bool> {
        Ok(self
            .held
            .lock()
            .map_err(|_| SeckillError::Store("mock lock poisoned".to_string()))?
            .contains(key))
    }
}

impl DistributedLock for MockLock {
    fn try_acquire(
        &self,
        key: &str,
        _ttl: Duration,
    ) -> impl std::future::Future<Output = Result<bool>> + Send {
        let held = Arc::clone(&self.held);
        let key = key.to_string();
        async move {
            Ok(held
                .lock()
                .map_err(|_| SeckillError::Store("mock lock poisoned".to_string()))?
                .insert(key))
        }
    }

    fn release(&self, key: &str) -> impl std::future::Future<Output = Result<()>> + Send {
        let held = Arc::clone(&self.held);
        let key = key.to_string();
        async move {
            held.lock()
                .map_err(|_| SeckillError::Store("mock lock poisoned".to_string()))?
                .remove(&key);
            Ok(())
        }
    }
}
