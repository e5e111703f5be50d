//! Mock id source.

use crate::error::Result;
use crate::providers::IdSource;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Mock id source: a process-local atomic counter shared across all
/// namespaces. Strictly increasing, never duplicated.
#[derive(Clone, Default)]
pub struct MockIdSource {
    next: Arc<AtomicI64>,
}

impl MockIdSource {
    /// Create a mock id source starting at 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdSource for MockIdSource {
    fn next_id(&self, _key_type: &str) -> impl std::future::Future<Output = Result<i64>> + Send {
        let next = Arc::clone(&self.next);
        async move { Ok(next.fetch_add(1, Ordering::SeqCst) + 1) }
    }
}
