//! System tick counting.

use portable_atomic::{AtomicU32, Ordering};

/// Count of `Kernel::tick` calls since boot.
///
/// Only advanced from the tick path with interrupts masked, so a plain
/// load/store pair is enough and no read-modify-write atomics are needed.
/// Wraps around after `u32::MAX` ticks.
pub struct TickCounter {
    ticks: AtomicU32,
}

impl TickCounter {
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU32::new(0),
        }
    }

    /// Advance by one tick. Interrupts must be masked.
    pub(crate) fn advance(&self) -> u32 {
        let now = self.ticks.load(Ordering::Acquire).wrapping_add(1);
        self.ticks.store(now, Ordering::Release);
        now
    }

    /// Ticks since boot.
    pub fn ticks(&self) -> u32 {
        self.ticks.load(Ordering::Acquire)
    }
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_counter() {
        let counter = TickCounter::new();
        assert_eq!(counter.ticks(), 0);

        counter.advance();
        assert_eq!(counter.advance(), 2);
        assert_eq!(counter.ticks(), 2);
    }

    #[test]
    fn test_counter_wraps() {
        let counter = TickCounter::new();
        counter.ticks.store(u32::MAX - 1, Ordering::Relaxed);
        counter.advance();
        assert_eq!(counter.advance(), 0);
        assert_eq!(counter.advance(), 1);
    }
}
