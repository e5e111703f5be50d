//! Voucher lookup trait.

use crate::error::Result;
use crate::types::{Voucher, VoucherId};

/// Read access to vouchers, for the admission window checks.
///
/// Implementations are free to serve from cache; the activity window is
/// not part of the oversell invariant, so an ordinary (possibly slightly
/// stale) read is acceptable here.
pub trait VoucherSource: Send + Sync {
    /// Load a voucher by id.
    ///
    /// # Errors
    ///
    /// Returns error on store failure. A missing voucher is `Ok(None)`.
    fn load(
        &self,
        id: VoucherId,
    ) -> impl std::future::Future<Output = Result<Option<Voucher>>> + Send;
}
