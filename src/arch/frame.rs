//! Initial execution frame synthesis.
//!
//! A thread that has never run must look exactly like a thread that was
//! preempted once: the switch routine pops R4-R11 from its stack and the
//! exception return pops the hardware frame (R0-R3, R12, LR, PC, xPSR).
//! Everything that knows this layout lives here.
//!
//! ```text
//!  high  +-----------+ <- top (8-byte aligned)
//!        | xPSR      |
//!        | PC        |  entry
//!        | LR        |  thread-return trap
//!        | R12,R3-R0 |
//!        | R11..R4   |
//!        +-----------+ <- saved sp
//!        | DEADBEEF  |
//!        |   ...     |
//!  low   +-----------+ <- bottom (8-byte aligned)
//! ```

use crate::errors::{require, Fault};
use core::mem::size_of;

/// Word pushed by hardware and software alike.
pub type StackWord = usize;

/// Callee-saved registers R4-R11, stacked by the switch routine.
pub const CALLEE_WORDS: usize = 8;

/// Registers stacked by the core on exception entry.
pub const EXCEPTION_WORDS: usize = 8;

/// Words occupied by a synthesized frame.
pub const INITIAL_FRAME_WORDS: usize = CALLEE_WORDS + EXCEPTION_WORDS;

/// Fill pattern for never-used stack words.
pub const STACK_SENTINEL: StackWord = 0xDEAD_BEEF;

/// xPSR with only the Thumb state bit set.
pub const XPSR_THUMB: StackWord = 1 << 24;

const STACK_ALIGN: usize = 8;
const WORD: usize = size_of::<StackWord>();

/// Offsets inside the hardware-stacked part of a frame.
pub mod exception {
    pub const R0: usize = 0;
    pub const R1: usize = 1;
    pub const R2: usize = 2;
    pub const R3: usize = 3;
    pub const R12: usize = 4;
    pub const LR: usize = 5;
    pub const PC: usize = 6;
    pub const XPSR: usize = 7;
}

/// Aligned address range a thread's stack occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackBounds {
    /// Lowest usable address
    pub bottom: usize,
    /// One past the highest usable address
    pub top: usize,
}

impl StackBounds {
    /// Usable size in words.
    pub fn words(&self) -> usize {
        (self.top - self.bottom) / WORD
    }
}

/// Saved-context handle of a thread that has not run yet.
#[derive(Debug, Clone, Copy)]
pub struct InitialContext {
    /// Stack pointer to hand to the switch routine
    pub sp: usize,
    pub bounds: StackBounds,
}

/// Write an initial frame at the top of `stack` and paint the rest.
///
/// The first switch to the returned context resumes at `entry` in Thumb
/// state; if `entry` ever returns it lands in `on_return`.
pub fn synthesize(stack: &mut [StackWord], entry: usize, on_return: usize) -> InitialContext {
    let base = stack.as_ptr() as usize;
    let end = base + stack.len() * WORD;
    let top = end & !(STACK_ALIGN - 1);
    let bottom = (base + STACK_ALIGN - 1) & !(STACK_ALIGN - 1);

    let words = top.saturating_sub(bottom) / WORD;
    require!(
        words >= INITIAL_FRAME_WORDS,
        Fault::StackTooSmall { words, needed: INITIAL_FRAME_WORDS }
    );

    let top_idx = (top - base) / WORD;
    let bottom_idx = (bottom - base) / WORD;
    let sp_idx = top_idx - INITIAL_FRAME_WORDS;

    let (callee, hw) = stack[sp_idx..top_idx].split_at_mut(CALLEE_WORDS);

    // R4..R11 hold their own register number
    for (n, slot) in callee.iter_mut().enumerate() {
        *slot = 4 + n;
    }

    hw[exception::R0] = 0x0;
    hw[exception::R1] = 0x1;
    hw[exception::R2] = 0x2;
    hw[exception::R3] = 0x3;
    hw[exception::R12] = 0xC;
    hw[exception::LR] = on_return;
    // exception return requires an even PC
    hw[exception::PC] = entry & !1;
    hw[exception::XPSR] = XPSR_THUMB;

    stack[bottom_idx..sp_idx].fill(STACK_SENTINEL);

    InitialContext {
        sp: base + sp_idx * WORD,
        bounds: StackBounds { bottom, top },
    }
}

/// Count sentinel words from the bottom of a stack up to the first word
/// the thread has touched.
///
/// # Safety
///
/// `bounds` must describe a live stack handed to [`synthesize`].
pub unsafe fn untouched_words(bounds: &StackBounds) -> usize {
    let mut addr = bounds.bottom;
    let mut count = 0;
    while addr < bounds.top {
        // SAFETY: addr is inside the stack region per the caller's contract
        let word = unsafe { core::ptr::read_volatile(addr as *const StackWord) };
        if word != STACK_SENTINEL {
            break;
        }
        count += 1;
        addr += WORD;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    extern crate std;
    use std::vec;

    fn trap() {}

    #[test]
    fn test_frame_layout() {
        let mut stack = vec![0usize; 64];
        let entry = 0x0800_1235usize;
        let ret = trap as *const () as usize;
        let ctx = synthesize(&mut stack, entry, ret);

        let base = stack.as_ptr() as usize;
        let sp_idx = (ctx.sp - base) / WORD;
        assert_eq!(sp_idx, stack.len() - INITIAL_FRAME_WORDS);

        let frame = &stack[sp_idx..];
        assert_eq!(&frame[..CALLEE_WORDS], &[4, 5, 6, 7, 8, 9, 10, 11]);
        let hw = &frame[CALLEE_WORDS..];
        assert_eq!(hw[exception::R0], 0);
        assert_eq!(hw[exception::R3], 3);
        assert_eq!(hw[exception::R12], 0xC);
        assert_eq!(hw[exception::LR], ret);
        assert_eq!(hw[exception::PC], 0x0800_1234);
        assert_eq!(hw[exception::XPSR], XPSR_THUMB);
    }

    #[test]
    fn test_unused_stack_painted() {
        let mut stack = vec![0usize; 48];
        let ctx = synthesize(&mut stack, 0x100, 0x200);
        let sp_idx = (ctx.sp - stack.as_ptr() as usize) / WORD;
        assert!(stack[..sp_idx].iter().all(|&w| w == STACK_SENTINEL));
        assert_eq!(unsafe { untouched_words(&ctx.bounds) }, 48 - INITIAL_FRAME_WORDS);
    }

    #[test]
    fn test_touched_word_ends_headroom() {
        let mut stack = vec![0usize; 40];
        let ctx = synthesize(&mut stack, 0x100, 0x200);
        stack[10] = 0x1234;
        assert_eq!(unsafe { untouched_words(&ctx.bounds) }, 10);
    }

    #[test]
    fn test_exact_fit() {
        let mut stack = vec![0usize; INITIAL_FRAME_WORDS];
        let ctx = synthesize(&mut stack, 0x100, 0x200);
        assert_eq!(ctx.sp, stack.as_ptr() as usize);
        assert_eq!(ctx.bounds.words(), INITIAL_FRAME_WORDS);
    }

    #[test]
    #[should_panic(expected = "stack too small")]
    fn test_stack_too_small() {
        let mut stack = vec![0usize; INITIAL_FRAME_WORDS - 1];
        synthesize(&mut stack, 0x100, 0x200);
    }
}
