//! Concrete store implementations backed by Redis and Postgres.

mod admission_redis;
mod lock_reentrant_redis;
mod lock_token_redis;
mod order_postgres;
mod voucher_postgres;

pub use admission_redis::RedisAdmissionStore;
pub use lock_reentrant_redis::RedisReentrantLock;
pub use lock_token_redis::RedisTokenLock;
pub use order_postgres::PostgresOrderRepository;
pub use voucher_postgres::VoucherStore;
