//! Priority-indexed thread table.

use super::{Priority, MAX_PRIO};
use crate::errors::{require, Fault};
use crate::thread::Tcb;
use spin::Once;

const SLOTS: usize = MAX_PRIO as usize + 1;

/// Append-only table mapping each priority to at most one [`Tcb`].
///
/// Slots are write-once: a registered thread can never be replaced or
/// removed, which is what lets the switch routine hold raw pointers into
/// the table.
pub struct Registry {
    slots: [Once<Tcb>; SLOTS],
}

impl Registry {
    pub const fn new() -> Self {
        const EMPTY: Once<Tcb> = Once::new();
        Self { slots: [EMPTY; SLOTS] }
    }

    /// Fault unless `prio` is in range and still free.
    pub fn check_free(&self, prio: Priority) {
        require!(prio <= MAX_PRIO, Fault::PriorityOutOfRange(prio));
        require!(!self.slots[prio as usize].is_completed(), Fault::PriorityTaken(prio));
    }

    /// Install `tcb` at `prio`.
    pub fn install(&self, prio: Priority, tcb: Tcb) -> &Tcb {
        self.check_free(prio);
        self.slots[prio as usize].call_once(|| tcb)
    }

    /// Thread registered at `prio`, if any.
    pub fn get(&self, prio: Priority) -> Option<&Tcb> {
        self.slots.get(prio as usize)?.get()
    }

    pub fn is_registered(&self, prio: Priority) -> bool {
        self.get(prio).is_some()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
