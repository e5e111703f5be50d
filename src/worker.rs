//! Background persistence worker.
//!
//! The one intentionally serialized stage of the pipeline: a single
//! consumer drains the order queue and commits each item durably. It is
//! an explicitly owned task: the composition root creates it, spawns
//! it, and signals shutdown through a broadcast channel; on shutdown it
//! drains whatever is still queued before exiting. A crash before drain
//! loses at most the in-flight queue depth of admitted orders; that
//! bounded loss window is the documented cost of keeping admission
//! latency off the durable store's critical path.
//!
//! Persistence anomalies (duplicate row, exhausted durable stock) are
//! logged and dropped, not re-enqueued; automatic retry of a
//! constraint violation can only loop. Reconciliation of dropped items
//! is an extension point for a dead-letter consumer, not implemented
//! here.

use crate::providers::{OrderRepository, PersistOutcome};
use crate::queue::OrderReceiver;
use crate::types::Order;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Order persistence worker.
pub struct PersistenceWorker<R: OrderRepository> {
    receiver: OrderReceiver,
    repository: R,
    shutdown: broadcast::Receiver<()>,
}

impl<R: OrderRepository + 'static> PersistenceWorker<R> {
    /// Create a worker over the queue's receiving half.
    #[must_use]
    pub const fn new(
        receiver: OrderReceiver,
        repository: R,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            receiver,
            repository,
            shutdown,
        }
    }

    /// Spawn the worker as a background task.
    ///
    /// The handle resolves once the worker has observed shutdown (or the
    /// queue closing) and finished draining.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        tracing::info!("Persistence worker started");
        loop {
            tokio::select! {
                item = self.receiver.rx.recv() => match item {
                    Some(order) => self.persist(order).await,
                    None => {
                        tracing::info!("Order queue closed, persistence worker exiting");
                        return;
                    }
                },
                _ = self.shutdown.recv() => {
                    tracing::info!("Shutdown signal received, draining order queue");
                    self.drain().await;
                    return;
                }
            }
        }
    }

    /// Persist everything still queued, then stop.
    async fn drain(&mut self) {
        let mut drained = 0_usize;
        while let Ok(order) = self.receiver.rx.try_recv() {
            self.persist(order).await;
            drained += 1;
        }
        tracing::info!(drained = drained, "Persistence worker drained");
    }

    async fn persist(&self, order: Order) {
        match self.repository.persist_admitted(&order).await {
            Ok(PersistOutcome::Persisted) => {
                tracing::debug!(order_id = %order.id, "Order persisted");
            }
            Ok(PersistOutcome::DuplicateOrder) => {
                // The fast store should have screened this; the durable
                // constraint is the backstop doing its job.
                tracing::warn!(
                    order_id = %order.id,
                    voucher_id = %order.voucher_id,
                    user_id = %order.user_id,
                    "Duplicate order dropped by uniqueness constraint"
                );
            }
            Ok(PersistOutcome::StockExhausted) => {
                tracing::warn!(
                    order_id = %order.id,
                    voucher_id = %order.voucher_id,
                    "Durable stock exhausted, admitted order not persisted"
                );
            }
            Err(e) => {
                // Not re-enqueued: see module docs.
                tracing::error!(
                    order_id = %order.id,
                    error = %e,
                    "Failed to persist admitted order"
                );
            }
        }
    }
}
