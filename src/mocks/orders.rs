//! Mock order repository.

use crate::error::{Result, SeckillError};
use crate::providers::{OrderRepository, PersistOutcome};
use crate::types::{Order, VoucherId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Inner {
    stock: HashMap<VoucherId, i64>,
    orders: Vec<Order>,
}

/// Mock order repository.
///
/// Applies the same transactional rules as the `PostgreSQL` backend:
/// stock-guarded decrement plus `(voucher, user)` uniqueness, atomically
/// under one mutex.
#[derive(Clone)]
pub struct MockOrderRepository {
    inner: Arc<Mutex<Inner>>,
    default_stock: i64,
}

impl MockOrderRepository {
    /// Create a mock repository whose vouchers start with `default_stock`
    /// durable stock.
    #[must_use]
    pub fn new(default_stock: i64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            default_stock,
        }
    }

    /// Override durable stock for one voucher.
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned.
    pub fn set_stock(&self, voucher_id: VoucherId, stock: i64) -> Result<()> {
        self.inner
            .lock()
            .map_err(|_| SeckillError::Database("mock repository poisoned".to_string()))?
            .stock
            .insert(voucher_id, stock);
        Ok(())
    }

    /// Number of persisted orders (for assertions).
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned.
    pub fn persisted_count(&self) -> Result<usize> {
        Ok(self
            .inner
            .lock()
            .map_err(|_| SeckillError::Database("mock repository poisoned".to_string()))?
            .orders
            .len())
    }

    /// Snapshot of persisted orders (for assertions).
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned.
    pub fn persisted_orders(&self) -> Result<Vec<Order>> {
        Ok(self
            .inner
            .lock()
            .map_err(|_| SeckillError::Database("mock repository poisoned".to_string()))?
            .orders
            .clone())
    }
}

impl OrderRepository for MockOrderRepository {
    fn persist_admitted(
        &self,
        order: &Order,
    ) -> impl std::future::Future<Output = Result<PersistOutcome>> + Send {
        let inner = Arc::clone(&self.inner);
        let default_stock = self.default_stock;
        let order = order.clone();
        async move {
            let mut inner = inner
                .lock()
                .map_err(|_| SeckillError::Database("mock repository poisoned".to_string()))?;

            let stock = *inner
                .stock
                .entry(order.voucher_id)
                .or_insert(default_stock);
            if stock <= 0 {
                return Ok(PersistOutcome::StockExhausted);
            }
            if inner
                .orders
                .iter()
                .any(|o| o.voucher_id == order.voucher_id && o.user_id == order.user_id)
            {
                return Ok(PersistOutcome::DuplicateOrder);
            }
            inner.stock.insert(order.voucher_id, stock - 1);
            inner.orders.push(order);
            Ok(PersistOutcome::Persisted)
        }
    }
}
