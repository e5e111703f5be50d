//! Atomic admission store trait.

use crate::error::Result;
use crate::types::{AdmissionVerdict, UserId, VoucherId};

/// The fast store's atomic admission step.
///
/// `admit` checks remaining stock and per-user membership, and, only if
/// stock is positive and the user is absent, decrements stock and
/// registers the user, all as one indivisible operation. No concurrent
/// caller may observe or act on an intermediate state; this is the
/// property that prevents oversell and duplicate purchase under
/// arbitrary concurrency.
///
/// Re-invoking `admit` for an already-admitted pair always returns
/// [`AdmissionVerdict::Duplicate`] and never touches stock again.
pub trait AdmissionStore: Send + Sync {
    /// Run the atomic check-and-reserve step for `(voucher_id, user_id)`.
    ///
    /// # Errors
    ///
    /// Returns error on store failure (the admission must then fail; the
    /// caller must not fall back to unguarded relational writes).
    fn admit(
        &self,
        voucher_id: VoucherId,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<AdmissionVerdict>> + Send;

    /// Publish the stock counter for a voucher, overwriting any previous
    /// value. Called when a voucher is activated for sale.
    ///
    /// # Errors
    ///
    /// Returns error on store failure.
    fn seed(
        &self,
        voucher_id: VoucherId,
        stock: i64,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Read the current stock counter, if the voucher has been seeded.
    ///
    /// # Errors
    ///
    /// Returns error on store failure.
    fn stock(
        &self,
        voucher_id: VoucherId,
    ) -> impl std::future::Future<Output = Result<Option<i64>>> + Send;
}
