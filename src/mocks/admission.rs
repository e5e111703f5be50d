//! Mock admission store.

use crate::error::{Result, SeckillError};
use crate::providers::AdmissionStore;
use crate::types::{AdmissionVerdict, UserId, VoucherId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Inner {
    stock: HashMap<VoucherId, i64>,
    buyers: HashMap<VoucherId, HashSet<UserId>>,
}

/// Mock admission store.
///
/// One mutex guards both the stock counters and the membership sets, so
/// `admit` is exactly as indivisible as the real store's script.
#[derive(Clone, Default)]
pub struct MockAdmissionStore {
    inner: Arc<Mutex<Inner>>,
}

impl MockAdmissionStore {
    /// Create an empty mock store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of admitted buyers for a voucher (for assertions).
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned.
    pub fn buyer_count(&self, voucher_id: VoucherId) -> Result<usize> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| SeckillError::Store("mock store poisoned".to_string()))?;
        Ok(inner.buyers.get(&voucher_id).map_or(0, HashSet::len))
    }
}

impl AdmissionStore for MockAdmissionStore {
    fn admit(
        &self,
        voucher_id: VoucherId,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<AdmissionVerdict>> + Send {
        let inner = Arc::clone(&self.inner);
        async move {
            let mut inner = inner
                .lock()
                .map_err(|_| SeckillError::Store("mock store poisoned".to_string()))?;

            if inner
                .buyers
                .get(&voucher_id)
                .is_some_and(|set| set.contains(&user_id))
            {
                return Ok(AdmissionVerdict::Duplicate);
            }
            let stock = inner.stock.get(&voucher_id).copied().unwrap_or(0);
            if stock <= 0 {
                return Ok(AdmissionVerdict::SoldOut);
            }
            inner.stock.insert(voucher_id, stock - 1);
            inner.buyers.entry(voucher_id).or_default().insert(user_id);
            Ok(AdmissionVerdict::Admitted)
        }
    }

    fn seed(
        &self,
        voucher_id: VoucherId,
        stock: i64,
    ) -> impl std::future::Future<Output = Result<()>> + Send {
        let inner = Arc::clone(&self.inner);
        async move {
            inner
                .lock()
                .map_err(|_| SeckillError::Store("mock store poisoned".to_string()))?
                .stock
                .insert(voucher_id, stock);
            Ok(())
        }
    }

    fn stock(
        &self,
        voucher_id: VoucherId,
    ) -> impl std::future::Future<Output = Result<Option<i64>>> + Send {
        let inner = Arc::clone(&self.inner);
        async move {
            Ok(inner
                .lock()
                .map_err(|_| SeckillError::Store("mock store poisoned".to_string()))?
                .stock
                .get(&voucher_id)
                .copied())
        }
    }
}
