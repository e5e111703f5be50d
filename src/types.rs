//! Core domain types: ids, vouchers, orders, admission verdicts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Voucher identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct VoucherId(pub i64);

/// User identifier.
///
/// Passed explicitly into every operation that needs it; there is no
/// ambient request context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct UserId(pub i64);

/// Order identifier, assigned by the id generator at admission time,
/// before the order is durable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct OrderId(pub i64);

impl std::fmt::Display for VoucherId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A time-boxed voucher with scarce stock.
///
/// The activity window is `[begin_time, end_time)`. `stock` is mutated
/// only through the admission path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Voucher {
    /// Voucher id.
    pub id: VoucherId,
    /// Remaining stock. Non-negative.
    pub stock: i32,
    /// Activity window start (inclusive).
    pub begin_time: DateTime<Utc>,
    /// Activity window end (exclusive).
    pub end_time: DateTime<Utc>,
}

impl Voucher {
    /// Whether the activity window contains `now`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.begin_time <= now && now < self.end_time
    }
}

/// An admitted purchase, durable once the persistence worker commits it.
///
/// Invariant: `(voucher_id, user_id)` is unique across all orders ever
/// created, enforced by the fast-store membership set at admission and
/// again by a UNIQUE constraint in the orders table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Order id.
    pub id: OrderId,
    /// Voucher purchased.
    pub voucher_id: VoucherId,
    /// Purchasing user.
    pub user_id: UserId,
    /// Admission timestamp.
    pub created_at: DateTime<Utc>,
}

/// Outcome of the atomic admission step against the fast store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionVerdict {
    /// Stock was decremented and the user registered; build an order.
    Admitted,
    /// No stock remained.
    SoldOut,
    /// The user was already registered for this voucher; stock untouched.
    Duplicate,
}

impl AdmissionVerdict {
    /// Decode the integer returned by the fast store's admission script.
    ///
    /// Script contract: `0` = admitted, `1` = sold out, `2` = duplicate.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SeckillError::Store`] for any other value.
    pub fn from_script_code(code: i64) -> crate::Result<Self> {
        match code {
            0 => Ok(Self::Admitted),
            1 => Ok(Self::SoldOut),
            2 => Ok(Self::Duplicate),
            other => Err(crate::SeckillError::Store(format!(
                "admission script returned unknown code {other}"
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn activity_window_is_half_open() {
        let begin = Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).single().unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).single().unwrap();
        let voucher = Voucher {
            id: VoucherId(1),
            stock: 10,
            begin_time: begin,
            end_time: end,
        };

        assert!(voucher.is_active_at(begin));
        assert!(voucher.is_active_at(begin + chrono::Duration::hours(1)));
        assert!(!voucher.is_active_at(end));
        assert!(!voucher.is_active_at(begin - chrono::Duration::seconds(1)));
    }

    #[test]
    fn verdict_decodes_script_codes() {
        assert_eq!(
            AdmissionVerdict::from_script_code(0).unwrap(),
            AdmissionVerdict::Admitted
        );
        assert_eq!(
            AdmissionVerdict::from_script_code(1).unwrap(),
            AdmissionVerdict::SoldOut
        );
        assert_eq!(
            AdmissionVerdict::from_script_code(2).unwrap(),
            AdmissionVerdict::Duplicate
        );
        assert!(AdmissionVerdict::from_script_code(3).is_err());
    }
}
