//! Error types for flash-sale admission operations.

use thiserror::Error;

/// Result type alias for seckill operations.
pub type Result<T> = std::result::Result<T, SeckillError>;

/// Business rejection reasons.
///
/// These are expected, user-facing outcomes of an admission attempt.
/// They are carried as structured values, never used as control-flow
/// exceptions and never fatal.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The voucher's activity window has not opened yet.
    #[error("Activity has not started")]
    ActivityNotStarted,

    /// The voucher's activity window has closed.
    #[error("Activity has ended")]
    ActivityEnded,

    /// No stock remains for this voucher.
    #[error("Voucher is sold out")]
    SoldOut,

    /// This user already holds an order for this voucher.
    #[error("User has already purchased this voucher")]
    AlreadyPurchased,

    /// A required lock could not be acquired within the caller's budget.
    #[error("Lock contention, try again")]
    Contention,
}

/// Error taxonomy for the flash-sale core.
///
/// Organized by category:
///
/// - `Validation`: malformed input (e.g. a missing id)
/// - `NotFound`: entity absent from cache and backing store
/// - `Rejected`: expected business outcomes (see [`Rejection`])
/// - `QueueFull` / `QueueClosed`: the persistence pipeline refused an
///   admitted order; a silent drop would leave stock decremented with no
///   order to show for it, so these always surface
/// - `Store` / `Database` / `Serialization`: infrastructure failures;
///   these propagate to the caller, the system never falls back to
///   unguarded relational writes when the fast store is unreachable
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SeckillError {
    /// Malformed input.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Entity not found.
    #[error("Not found")]
    NotFound,

    /// Expected business rejection.
    #[error("Rejected: {0}")]
    Rejected(#[from] Rejection),

    /// The order queue is full and the configured overflow policy refused
    /// the enqueue.
    #[error("Order queue is full")]
    QueueFull,

    /// The order queue's consumer is gone.
    #[error("Order queue is closed")]
    QueueClosed,

    /// Fast-store (Redis) operation failed.
    #[error("Store error: {0}")]
    Store(String),

    /// Durable-store (PostgreSQL) operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Cache payload serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SeckillError {
    /// Returns `true` if this error is an expected business rejection
    /// rather than a failure.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// The rejection reason, if this error is one.
    #[must_use]
    pub const fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::Rejected(r) => Some(*r),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_are_rejections() {
        assert!(SeckillError::Rejected(Rejection::SoldOut).is_rejection());
        assert_eq!(
            SeckillError::Rejected(Rejection::SoldOut).rejection(),
            Some(Rejection::SoldOut)
        );
    }

    #[test]
    fn infrastructure_errors_are_not_rejections() {
        assert!(!SeckillError::Store("down".into()).is_rejection());
        assert!(!SeckillError::QueueFull.is_rejection());
        assert_eq!(SeckillError::NotFound.rejection(), None);
    }
}
