//! Ready/delayed bookkeeping and priority selection.
//!
//! Every method that touches the sets or the switch slots takes an
//! [`IrqGuard`] as proof that interrupts are masked. Those methods are
//! crate-private: only the owning kernel builds guards on its own platform,
//! so the proof and the switch request always reach the right core. The sets also sit
//! behind a spin lock, which is never contended on a single core because it
//! is only taken under the mask.

use super::{Priority, PrioritySet, Registry, IDLE_PRIORITY};
use crate::arch::{Arch, IrqGuard, SwitchSlots};
use crate::errors::{fault, require, Fault};
use crate::thread::Tcb;
use spin::Mutex;

/// The ready and delayed sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetSnapshot {
    pub ready: PrioritySet,
    pub delayed: PrioritySet,
}

/// Scheduler state: registry, ready/delayed sets and the switch slots.
pub struct Scheduler {
    registry: Registry,
    sets: Mutex<SetSnapshot>,
    slots: SwitchSlots,
}

impl Scheduler {
    pub const fn new() -> Self {
        Self {
            registry: Registry::new(),
            sets: Mutex::new(SetSnapshot {
                ready: PrioritySet::EMPTY,
                delayed: PrioritySet::EMPTY,
            }),
            slots: SwitchSlots::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn switch_slots(&self) -> &SwitchSlots {
        &self.slots
    }

    /// Install `tcb` and make it ready unless it is the idle thread.
    pub(crate) fn register<A: Arch>(&self, tcb: Tcb, _irq: &IrqGuard<'_, A>) -> &Tcb {
        let prio = tcb.priority();
        let tcb = self.registry.install(prio, tcb);
        if prio != IDLE_PRIORITY {
            self.sets.lock().ready.insert(prio);
        }
        tcb
    }

    /// Pick the highest ready thread, or idle, as `Next` and pend a switch
    /// if it is not the running thread.
    pub(crate) fn select_and_request<A: Arch>(&self, irq: &IrqGuard<'_, A>) -> Priority {
        let prio = self.sets.lock().ready.highest().unwrap_or(IDLE_PRIORITY);
        let next = match self.registry.get(prio) {
            Some(tcb) => tcb,
            None => fault(Fault::UnregisteredReady(prio)),
        };

        self.slots.set_next(next);
        if next.as_ptr() != self.slots.current_ptr() {
            log::trace!("switch requested to priority {}", prio);
            irq.arch().request_switch();
        }
        prio
    }

    /// Advance every delayed thread by one tick. Returns the priorities that
    /// became ready.
    pub(crate) fn tick<A: Arch>(&self, _irq: &IrqGuard<'_, A>) -> PrioritySet {
        let mut sets = self.sets.lock();
        let mut woken = PrioritySet::new();

        // walk a copy taken on entry so removals below don't disturb it
        let delayed = sets.delayed;
        for prio in delayed.iter() {
            let tcb = match self.registry.get(prio) {
                Some(tcb) => tcb,
                None => fault(Fault::UnregisteredDelayed(prio)),
            };
            let left = tcb.timeout();
            require!(left != 0, Fault::DelayedWithoutTimeout(prio));

            tcb.set_timeout(left - 1);
            if left == 1 {
                sets.delayed.remove(prio);
                sets.ready.insert(prio);
                woken.insert(prio);
            }
        }

        if !woken.is_empty() {
            log::trace!("tick woke {:?}", woken);
        }
        woken
    }

    /// Move the running thread from ready to delayed for `ticks` ticks and
    /// reschedule.
    pub(crate) fn block_current<A: Arch>(&self, ticks: u32, irq: &IrqGuard<'_, A>) -> Priority {
        let current = match self.slots.current() {
            Some(tcb) => tcb,
            None => fault(Fault::NotStarted),
        };
        let prio = current.priority();
        require!(prio != IDLE_PRIORITY, Fault::IdleDelay);
        require!(ticks != 0, Fault::ZeroDelay);

        current.set_timeout(ticks);
        {
            let mut sets = self.sets.lock();
            sets.ready.remove(prio);
            sets.delayed.insert(prio);
        }
        log::trace!("priority {} delayed for {} ticks", prio, ticks);

        self.select_and_request(irq)
    }

    /// Consistent copy of both sets.
    pub(crate) fn snapshot<A: Arch>(&self, _irq: &IrqGuard<'_, A>) -> SetSnapshot {
        *self.sets.lock()
    }

    /// Priority of the running thread.
    pub fn current_priority(&self) -> Option<Priority> {
        self.slots.current().map(Tcb::priority)
    }

    /// Priority most recently selected to run.
    pub fn next_priority(&self) -> Option<Priority> {
        self.slots.next().map(Tcb::priority)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
