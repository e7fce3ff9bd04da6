//! Fixed-priority scheduling.
//!
//! Threads are identified by their priority. The ready and delayed sets are
//! bitmaps over `1..=MAX_PRIO`; the idle thread at priority 0 is never in
//! either and runs whenever the ready set is empty.

pub mod prio_set;
pub mod registry;
pub mod scheduler;

pub use prio_set::PrioritySet;
pub use registry::Registry;
pub use scheduler::{Scheduler, SetSnapshot};

/// Thread priority, higher runs first. Unique per thread.
pub type Priority = u8;

/// Highest usable priority; one bit per priority in a `u32`.
pub const MAX_PRIO: Priority = 32;

/// Priority of the idle thread.
pub const IDLE_PRIORITY: Priority = 0;
