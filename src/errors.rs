//! Kernel fault reporting.
//!
//! The kernel has no recoverable errors. Every misuse of the API and every
//! broken scheduler invariant is a [`Fault`]: it is logged and the system
//! halts through the panic handler. In hosted test builds the panic is
//! observable with `#[should_panic]`.

use core::fmt;

/// A fatal precondition or invariant violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Priority outside `0..=MAX_PRIO`
    PriorityOutOfRange(u8),
    /// Priority already has a registered thread
    PriorityTaken(u8),
    /// Stack cannot hold the initial frame after alignment
    StackTooSmall {
        /// Usable words after alignment
        words: usize,
        /// Words needed by the initial frame
        needed: usize,
    },
    /// Idle thread called `delay`
    IdleDelay,
    /// `delay(0)` is rejected
    ZeroDelay,
    /// Thread API called before the first context switch
    NotStarted,
    /// Ready set selected a priority with no registered thread
    UnregisteredReady(u8),
    /// Delayed set holds a thread whose timeout is already zero
    DelayedWithoutTimeout(u8),
    /// Delayed set holds a priority with no registered thread
    UnregisteredDelayed(u8),
    /// A thread entry function returned
    ThreadReturned,
    /// Context-switch execution phase entered while already running
    SwitchReentered,
    /// `Kernel::run` got control back
    RunReturned,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::PriorityOutOfRange(p) => write!(f, "priority {} out of range", p),
            Fault::PriorityTaken(p) => write!(f, "priority {} already registered", p),
            Fault::StackTooSmall { words, needed } => {
                write!(f, "stack too small: {} words, need {}", words, needed)
            }
            Fault::IdleDelay => write!(f, "idle thread must never delay"),
            Fault::ZeroDelay => write!(f, "delay of zero ticks"),
            Fault::NotStarted => write!(f, "scheduler not started"),
            Fault::UnregisteredReady(p) => write!(f, "ready priority {} has no thread", p),
            Fault::DelayedWithoutTimeout(p) => {
                write!(f, "delayed priority {} has zero timeout", p)
            }
            Fault::UnregisteredDelayed(p) => write!(f, "delayed priority {} has no thread", p),
            Fault::ThreadReturned => write!(f, "thread entry returned"),
            Fault::SwitchReentered => write!(f, "context switch re-entered"),
            Fault::RunReturned => write!(f, "control returned to Kernel::run"),
        }
    }
}

/// Report a fault and halt.
#[cold]
#[inline(never)]
pub fn fault(f: Fault) -> ! {
    log::error!("kernel fault: {}", f);
    panic!("kernel fault: {}", f)
}

/// Fault unless `cond` holds.
macro_rules! require {
    ($cond:expr, $fault:expr) => {
        if !$cond {
            $crate::errors::fault($fault);
        }
    };
}

pub(crate) use require;
