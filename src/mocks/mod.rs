//! In-memory test doubles for the provider traits.
//!
//! These run at memory speed and honor the same contracts as the real
//! backends (atomicity of the admission step, `(voucher, user)`
//! uniqueness, stock-guarded persistence), so concurrency properties can
//! be tested without Redis or `PostgreSQL`.

mod admission;
mod ids;
mod lock;
mod orders;
mod vouchers;

pub use admission::MockAdmissionStore;
pub use ids::MockIdSource;
pub use lock::MockLock;
pub use orders::MockOrderRepository;
pub use vouchers::MockVoucherSource;
