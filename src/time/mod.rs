//! Tick-based time.
//!
//! The kernel has no notion of wall-clock time: one tick is one call to
//! `Kernel::tick`, at whatever rate the board's periodic interrupt fires.

pub mod tick;

pub use tick::TickCounter;

/// Delay length in ticks.
pub type Ticks = u32;

/// Ticks covering at least `millis` milliseconds at `tick_hz`.
///
/// Rounds up so a delay is never shorter than asked, and never returns 0
/// for a non-zero request. Saturates at `Ticks::MAX`.
pub const fn millis_to_ticks(millis: u32, tick_hz: u32) -> Ticks {
    let ticks = (millis as u64 * tick_hz as u64).div_ceil(1000);
    if ticks > Ticks::MAX as u64 {
        Ticks::MAX
    } else {
        ticks as Ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_to_ticks() {
        assert_eq!(millis_to_ticks(10, 1000), 10);
        assert_eq!(millis_to_ticks(10, 100), 1);
        // 1 ms at 100 Hz is still a whole tick
        assert_eq!(millis_to_ticks(1, 100), 1);
        assert_eq!(millis_to_ticks(15, 100), 2);
        assert_eq!(millis_to_ticks(0, 1000), 0);
        assert_eq!(millis_to_ticks(u32::MAX, 10_000), Ticks::MAX);
    }
}
