//! Fixed-width priority bit-set.

use super::{Priority, MAX_PRIO};
use crate::errors::{require, Fault};
use core::fmt;

/// Set of non-idle priorities `1..=MAX_PRIO`, one bit each.
///
/// Priority `p` lives in bit `p - 1`, so the highest member is found with a
/// single count-leading-zeros.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct PrioritySet(u32);

impl PrioritySet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Create an empty set.
    pub const fn new() -> Self {
        Self::EMPTY
    }

    #[inline]
    fn bit(prio: Priority) -> u32 {
        require!((1..=MAX_PRIO).contains(&prio), Fault::PriorityOutOfRange(prio));
        1u32 << (prio - 1)
    }

    /// Add `prio` to the set.
    #[inline]
    pub fn insert(&mut self, prio: Priority) {
        self.0 |= Self::bit(prio);
    }

    /// Remove `prio` from the set.
    #[inline]
    pub fn remove(&mut self, prio: Priority) {
        self.0 &= !Self::bit(prio);
    }

    /// Priorities outside `1..=MAX_PRIO`, idle included, are never members.
    #[inline]
    pub fn contains(&self, prio: Priority) -> bool {
        (1..=MAX_PRIO).contains(&prio) && self.0 & (1u32 << (prio - 1)) != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Highest priority in the set.
    #[inline]
    pub fn highest(&self) -> Option<Priority> {
        if self.0 == 0 {
            None
        } else {
            Some((u32::BITS - self.0.leading_zeros()) as Priority)
        }
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Raw bit pattern, bit `p - 1` for priority `p`.
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Members from highest to lowest. Iterates a copy, so the set may be
    /// mutated while walking it.
    pub fn iter(&self) -> Iter {
        Iter(*self)
    }
}

/// Descending iterator over a [`PrioritySet`] snapshot.
pub struct Iter(PrioritySet);

impl Iterator for Iter {
    type Item = Priority;

    fn next(&mut self) -> Option<Priority> {
        let prio = self.0.highest()?;
        self.0.remove(prio);
        Some(prio)
    }
}

impl FromIterator<Priority> for PrioritySet {
    fn from_iter<I: IntoIterator<Item = Priority>>(iter: I) -> Self {
        let mut set = Self::new();
        for prio in iter {
            set.insert(prio);
        }
        set
    }
}

impl fmt::Debug for PrioritySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
