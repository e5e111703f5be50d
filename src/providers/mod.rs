//! Trait seams for swappable backends.
//!
//! Each capability the core depends on is a small trait: distributed
//! mutual exclusion, the atomic admission step, durable order
//! persistence, and voucher lookup. Redis/PostgreSQL implementations
//! live in [`crate::stores`]; in-memory test doubles in [`crate::mocks`].

mod admission;
mod ids;
mod lock;
mod orders;
mod vouchers;

pub use admission::AdmissionStore;
pub use ids::IdSource;
pub use lock::DistributedLock;
pub use orders::{OrderRepository, PersistOutcome};
pub use vouchers::VoucherSource;
