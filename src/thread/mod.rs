//! Thread control blocks.
//!
//! A [`Tcb`] is built exactly once, when its thread is registered, and lives
//! in the kernel's registry for the rest of the program. The switch routine
//! reads and writes `sp` through a raw pointer, so the field order is part of
//! the machine contract and is pinned below.

use crate::arch::frame::{self, InitialContext, StackBounds};
use crate::sched::Priority;
use portable_atomic::{AtomicU32, AtomicUsize, Ordering};
use static_assertions::const_assert_eq;

/// Thread body. Threads never finish.
pub type ThreadEntry = fn() -> !;

/// Per-thread saved state.
#[repr(C)]
#[derive(Debug)]
pub struct Tcb {
    /// Saved stack pointer; owned by the context-switch execution phase
    sp: AtomicUsize,
    /// Ticks left before the thread becomes ready again, 0 when not delayed
    timeout: AtomicU32,
    priority: Priority,
    stack: StackBounds,
}

// The switch routine stores the stack pointer at offset 0.
const_assert_eq!(core::mem::offset_of!(Tcb, sp), 0);

impl Tcb {
    /// Offset of the saved stack pointer.
    pub const SP_OFFSET: usize = core::mem::offset_of!(Tcb, sp);

    pub(crate) fn new(priority: Priority, ctx: InitialContext) -> Self {
        Self {
            sp: AtomicUsize::new(ctx.sp),
            timeout: AtomicU32::new(0),
            priority,
            stack: ctx.bounds,
        }
    }

    /// Registered priority.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Saved stack pointer. Only meaningful while the thread is not running.
    pub fn saved_sp(&self) -> usize {
        self.sp.load(Ordering::Acquire)
    }

    #[cfg(any(test, feature = "std-shim"))]
    pub(crate) fn set_saved_sp(&self, sp: usize) {
        self.sp.store(sp, Ordering::Release);
    }

    /// Remaining delay in ticks.
    pub fn timeout(&self) -> u32 {
        self.timeout.load(Ordering::Acquire)
    }

    /// Must be called with interrupts masked.
    pub(crate) fn set_timeout(&self, ticks: u32) {
        self.timeout.store(ticks, Ordering::Release);
    }

    /// Aligned bounds of this thread's stack.
    pub fn stack_bounds(&self) -> StackBounds {
        self.stack
    }

    /// Words at the bottom of the stack the thread has never written.
    pub fn stack_headroom(&self) -> usize {
        // SAFETY: bounds came from `synthesize` on a 'static stack
        unsafe { frame::untouched_words(&self.stack) }
    }

    pub(crate) fn as_ptr(&self) -> *mut Tcb {
        self as *const Tcb as *mut Tcb
    }
}

/// Landing pad installed as the initial LR of every thread.
pub(crate) extern "C-unwind" fn thread_returned() -> ! {
    crate::errors::fault(crate::errors::Fault::ThreadReturned)
}
