//! Transaction id arithmetic.

use std::fmt;

/// The numbering scheme of a backend's transaction ids.
///
/// Range building and snapshot refresh only manipulate ids through this
/// trait, so a backend with a different scheme supplies its own.
pub trait TxnIdSpace: fmt::Debug + Send + Sync {
    /// The id assigned after `id`, wrapping and skipping reserved ids.
    fn successor(&self, id: u64) -> u64;

    /// Returns true if `a` was assigned before `b`.
    fn precedes(&self, a: u64, b: u64) -> bool;

    /// Returns true if `a` was assigned before `b` or is `b`.
    fn precedes_or_equals(&self, a: u64, b: u64) -> bool {
        a == b || self.precedes(a, b)
    }

    /// Returns true if `id` can be assigned to a transaction.
    fn is_normal(&self, id: u64) -> bool;
}

/// PostgreSQL's 32-bit transaction ids.
///
/// Ids 0-2 are reserved. After `u32::MAX` the counter wraps to 3, and
/// ordering is modular: `a` precedes `b` when `a - b` is negative as a
/// signed 32-bit value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostgresTxnIdSpace;

impl PostgresTxnIdSpace {
    /// First id available to ordinary transactions.
    pub const FIRST_NORMAL_ID: u64 = 3;

    /// Largest id before wraparound.
    pub const MAX_ID: u64 = u32::MAX as u64;
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
impl TxnIdSpace for PostgresTxnIdSpace {
    fn successor(&self, id: u64) -> u64 {
        let next = if id >= Self::MAX_ID { 0 } else { id + 1 };
        next.max(Self::FIRST_NORMAL_ID)
    }

    fn precedes(&self, a: u64, b: u64) -> bool {
        ((a as u32).wrapping_sub(b as u32) as i32) < 0
    }

    fn is_normal(&self, id: u64) -> bool {
        (Self::FIRST_NORMAL_ID..=Self::MAX_ID).contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPACE: PostgresTxnIdSpace = PostgresTxnIdSpace;

    #[test]
    fn successor_wraps_past_reserved_ids() {
        assert_eq!(SPACE.successor(10), 11);
        assert_eq!(SPACE.successor(4_294_967_294), 4_294_967_295);
        assert_eq!(SPACE.successor(4_294_967_295), 3);
        assert_eq!(SPACE.successor(0), 3);
        assert_eq!(SPACE.successor(2), 3);
    }

    #[test]
    fn modular_ordering() {
        assert!(SPACE.precedes(5, 6));
        assert!(!SPACE.precedes(6, 5));
        assert!(!SPACE.precedes(6, 6));
        assert!(SPACE.precedes(4_294_967_295, 3));
        assert!(!SPACE.precedes(3, 4_294_967_295));
        assert!(SPACE.precedes_or_equals(7, 7));
    }

    #[test]
    fn reserved_ids_not_normal() {
        assert!(!SPACE.is_normal(0));
        assert!(!SPACE.is_normal(2));
        assert!(SPACE.is_normal(3));
        assert!(SPACE.is_normal(u64::from(u32::MAX)));
        assert!(!SPACE.is_normal(u64::from(u32::MAX) + 1));
    }
}
