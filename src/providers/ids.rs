//! Id source trait.

use crate::error::Result;

/// Produces globally unique, roughly time-ordered 64-bit ids.
///
/// Uniqueness holds within one `key_type` namespace; callers must not
/// mix namespaces. A failure to obtain the next sequence value is an
/// error; implementations never return a degraded or duplicate id.
pub trait IdSource: Send + Sync {
    /// Produce the next id in `key_type`'s namespace.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying sequence cannot be advanced.
    fn next_id(&self, key_type: &str) -> impl std::future::Future<Output = Result<i64>> + Send;
}
