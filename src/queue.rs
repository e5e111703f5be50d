//! Bounded holding area for admitted-but-not-yet-durable orders.
//!
//! An order in this queue has already decremented externally visible
//! stock, so losing it silently would leave a permanent stock/order
//! mismatch. Enqueue therefore fails loudly when the queue is full: the
//! configured policy either errors immediately or waits a bounded time
//! for capacity, never drops.

use crate::config::{OverflowPolicy, QueueConfig};
use crate::error::{Result, SeckillError};
use crate::types::Order;
use std::time::Duration;
use tokio::sync::mpsc;

/// Sending half of the order pipeline. Cheap to clone.
#[derive(Clone)]
pub struct OrderQueue {
    tx: mpsc::Sender<Order>,
    overflow: OverflowPolicy,
    wait_timeout: Duration,
}

/// Receiving half, owned by exactly one persistence worker.
pub struct OrderReceiver {
    pub(crate) rx: mpsc::Receiver<Order>,
}

impl OrderReceiver {
    /// Receive the next queued order, or `None` once all senders are gone.
    pub async fn recv(&mut self) -> Option<Order> {
        self.rx.recv().await
    }
}

/// Create a queue pair with the configured capacity and overflow policy.
#[must_use]
pub fn order_queue(config: &QueueConfig) -> (OrderQueue, OrderReceiver) {
    let (tx, rx) = mpsc::channel(config.capacity.max(1));
    (
        OrderQueue {
            tx,
            overflow: config.overflow,
            wait_timeout: config.wait_timeout(),
        },
        OrderReceiver { rx },
    )
}

impl OrderQueue {
    /// Hand an admitted order to the persistence pipeline.
    ///
    /// # Errors
    ///
    /// - [`SeckillError::QueueFull`]: no capacity within the policy's
    ///   bound; the caller must surface this, the admission already
    ///   consumed stock.
    /// - [`SeckillError::QueueClosed`]: the worker is gone.
    pub async fn enqueue(&self, order: Order) -> Result<()> {
        match self.overflow {
            OverflowPolicy::Reject => match self.tx.try_send(order) {
                Ok(()) => Ok(()),
                Err(mpsc::error::TrySendError::Full(order)) => {
                    tracing::error!(order_id = %order.id, "Order queue full, rejecting enqueue");
                    Err(SeckillError::QueueFull)
                }
                Err(mpsc::error::TrySendError::Closed(order)) => {
                    tracing::error!(order_id = %order.id, "Order queue closed");
                    Err(SeckillError::QueueClosed)
                }
            },
            OverflowPolicy::Wait => {
                match tokio::time::timeout(self.wait_timeout, self.tx.send(order)).await {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(mpsc::error::SendError(order))) => {
                        tracing::error!(order_id = %order.id, "Order queue closed");
                        Err(SeckillError::QueueClosed)
                    }
                    Err(_elapsed) => {
                        tracing::error!("Order queue full after bounded wait");
                        Err(SeckillError::QueueFull)
                    }
                }
            }
        }
    }

    /// Current free capacity, for health reporting.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.tx.capacity()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{OrderId, UserId, VoucherId};
    use chrono::Utc;

    fn order(n: i64) -> Order {
        Order {
            id: OrderId(n),
            voucher_id: VoucherId(1),
            user_id: UserId(n),
            created_at: Utc::now(),
        }
    }

    fn config(capacity: usize, overflow: OverflowPolicy) -> QueueConfig {
        QueueConfig {
            capacity,
            overflow,
            wait_timeout_ms: 50,
        }
    }

    #[tokio::test]
    async fn reject_policy_fails_immediately_when_full() {
        let (queue, _rx) = order_queue(&config(1, OverflowPolicy::Reject));
        assert_eq!(queue.capacity(), 1);

        queue.enqueue(order(1)).await.unwrap();
        assert_eq!(queue.capacity(), 0);
        let err = queue.enqueue(order(2)).await.unwrap_err();
        assert_eq!(err, SeckillError::QueueFull);
    }

    #[tokio::test]
    async fn wait_policy_fails_after_bounded_wait() {
        let (queue, _rx) = order_queue(&config(1, OverflowPolicy::Wait));

        queue.enqueue(order(1)).await.unwrap();
        let start = std::time::Instant::now();
        let err = queue.enqueue(order(2)).await.unwrap_err();
        assert_eq!(err, SeckillError::QueueFull);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn wait_policy_succeeds_when_capacity_frees_up() {
        let (queue, mut rx) = order_queue(&config(1, OverflowPolicy::Wait));

        queue.enqueue(order(1)).await.unwrap();
        let dequeue = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let received = rx.rx.recv().await;
            (received, rx)
        });
        queue.enqueue(order(2)).await.unwrap();
        let (received, _rx) = dequeue.await.unwrap();
        assert_eq!(received.unwrap().id, OrderId(1));
    }

    #[tokio::test]
    async fn enqueue_after_receiver_drop_is_closed() {
        let (queue, rx) = order_queue(&config(4, OverflowPolicy::Reject));
        drop(rx);
        let err = queue.enqueue(order(1)).await.unwrap_err();
        assert_eq!(err, SeckillError::QueueClosed);
    }
}
