//! # Seckill
//!
//! Flash-sale admission core: decide, under heavy concurrency, which
//! users get one of a voucher's scarce units, without overselling and
//! without letting any user buy twice.
//!
//! ## Architecture
//!
//! The hot path never touches the relational database:
//!
//! ```text
//! admit(voucher, user)
//!     → window check (cached voucher read)
//!     → atomic Redis script: stock counter + buyer set, one step
//!     → order id minted, order queued
//!     → caller returns with the order id
//!                  ⋯ later ⋯
//! persistence worker → guarded UPDATE + INSERT in one transaction
//! ```
//!
//! The Redis script is the system of record for admission; Postgres is
//! the durable ledger the worker reconciles into. Every store sits
//! behind a trait in [`providers`], with Redis/Postgres implementations
//! in [`stores`] and in-memory doubles in [`mocks`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use seckill::{AdmissionEngine, Config, order_queue, PersistenceWorker};
//!
//! let config = Config::from_env();
//! let (queue, receiver) = order_queue(&config.queue);
//! let engine = AdmissionEngine::new(vouchers, store, ids, queue);
//!
//! let worker = PersistenceWorker::new(receiver, repository, shutdown_rx);
//! let handle = worker.spawn();
//!
//! let order_id = engine.admit(voucher_id, user_id, Utc::now()).await?;
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod id;
pub mod keys;
pub mod lock;
pub mod providers;
pub mod queue;
pub mod stores;
pub mod types;
pub mod worker;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use cache::CacheAsideClient;
pub use config::{CacheConfig, Config, LockConfig, LockStrategy, OverflowPolicy, QueueConfig};
pub use engine::{AdmissionEngine, LockedAdmission};
pub use error::{Rejection, Result, SeckillError};
pub use id::IdGenerator;
pub use lock::LockClient;
pub use providers::{
    AdmissionStore, DistributedLock, IdSource, OrderRepository, PersistOutcome, VoucherSource,
};
pub use queue::{order_queue, OrderQueue, OrderReceiver};
pub use types::{AdmissionVerdict, Order, OrderId, UserId, Voucher, VoucherId};
pub use worker::PersistenceWorker;
