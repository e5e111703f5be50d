//! Durable order persistence trait.

use crate::error::Result;
use crate::types::Order;

/// Outcome of persisting an admitted order.
///
/// The two non-`Persisted` outcomes are anomalies: the fast store
/// already admitted the order, so the durable store disagreeing means
/// state drift. They are surfaced as values (not errors) so the worker
/// can log them without treating them as retryable failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// Stock re-decremented and order row committed.
    Persisted,
    /// The `(voucher_id, user_id)` uniqueness constraint fired; the order
    /// already exists durably.
    DuplicateOrder,
    /// The durable stock counter was already zero; nothing committed.
    StockExhausted,
}

/// Durable store for admitted orders.
///
/// `persist_admitted` must, within one transaction: re-apply the stock
/// decrement against the voucher row (guarded by `stock > 0`, defense in
/// depth behind the fast store's counter) and insert the order row
/// (guarded by the `(voucher_id, user_id)` UNIQUE constraint). Either
/// both effects commit or neither does.
pub trait OrderRepository: Send + Sync {
    /// Transactionally persist one admitted order.
    ///
    /// # Errors
    ///
    /// Returns error on database failure. Constraint/stock anomalies are
    /// reported through [`PersistOutcome`], not as errors.
    fn persist_admitted(
        &self,
        order: &Order,
    ) -> impl std::future::Future<Output = Result<PersistOutcome>> + Send;
}
