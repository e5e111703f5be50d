//! Mock voucher source.

use crate::error::{Result, SeckillError};
use crate::providers::VoucherSource;
use crate::types::{Voucher, VoucherId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock voucher source backed by a map.
#[derive(Clone, Default)]
pub struct MockVoucherSource {
    vouchers: Arc<Mutex<HashMap<VoucherId, Voucher>>>,
}

impl MockVoucherSource {
    /// Create an empty mock source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a voucher.
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned.
    pub fn put(&self, voucher: Voucher) -> Result<()> {
        self.vouchers
            .lock()
            .map_err(|_| SeckillError::Store("mock voucher source poisoned".to_string()))?
            .insert(voucher.id, voucher);
        Ok(())
    }
}

impl VoucherSource for MockVoucherSource {
    fn load(
        &self,
        id: VoucherId,
    ) -> impl std::future::Future<Output = Result<Option<Voucher>>> + Send {
        let vouchers = Arc::clone(&self.vouchers);
        async move {
            Ok(vouchers
                .lock()
                .map_err(|_| SeckillError::Store("mock voucher source poisoned".to_string()))?
                .get(&id)
                .cloned())
        }
    }
}
