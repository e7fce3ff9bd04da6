//! Simulated single-core platform for host builds and tests.
//!
//! Models PRIMASK, the PendSV pending bit, the process stack pointer and
//! the register file. The switch phase runs when interrupts are unmasked
//! with a switch pending, exactly where PendSV would tail-chain on hardware,
//! and it moves registers through the real thread stacks: the exception
//! frame and R4-R11 are pushed onto the outgoing stack and popped from the
//! incoming one. No thread code ever executes.

use super::frame::{StackWord, CALLEE_WORDS, EXCEPTION_WORDS};
use super::{Arch, SwitchSlots};
use crate::errors::{require, Fault};
use core::mem::size_of;
use core::ptr::null_mut;
use core::slice;
use portable_atomic::{AtomicBool, AtomicPtr, AtomicUsize, Ordering};
use spin::Mutex;

const WORD: usize = size_of::<StackWord>();

/// Register file of the simulated core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCpu {
    /// Process stack pointer
    pub psp: usize,
    /// R4-R11
    pub callee: [StackWord; CALLEE_WORDS],
    /// R0-R3, R12, LR, PC, xPSR in exception frame order
    pub frame: [StackWord; EXCEPTION_WORDS],
}

impl HostCpu {
    const RESET: Self = Self {
        psp: 0,
        callee: [0; CALLEE_WORDS],
        frame: [0; EXCEPTION_WORDS],
    };
}

pub struct HostArch {
    masked: AtomicBool,
    pending: AtomicBool,
    in_switch: AtomicBool,
    switch_prio_lowest: AtomicBool,
    switches: AtomicUsize,
    slots: AtomicPtr<SwitchSlots>,
    cpu: Mutex<HostCpu>,
}

impl HostArch {
    pub const fn new() -> Self {
        Self {
            masked: AtomicBool::new(false),
            pending: AtomicBool::new(false),
            in_switch: AtomicBool::new(false),
            switch_prio_lowest: AtomicBool::new(false),
            switches: AtomicUsize::new(0),
            slots: AtomicPtr::new(null_mut()),
            cpu: Mutex::new(HostCpu::RESET),
        }
    }

    /// Snapshot of the simulated registers.
    pub fn cpu(&self) -> HostCpu {
        *self.cpu.lock()
    }

    /// Overwrite the registers of the running thread.
    pub fn set_registers(
        &self,
        callee: [StackWord; CALLEE_WORDS],
        frame: [StackWord; EXCEPTION_WORDS],
    ) {
        let mut cpu = self.cpu.lock();
        cpu.callee = callee;
        cpu.frame = frame;
    }

    pub fn is_switch_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Number of switch phases that changed threads.
    pub fn switch_count(&self) -> usize {
        self.switches.load(Ordering::Acquire)
    }

    pub fn switch_priority_configured(&self) -> bool {
        self.switch_prio_lowest.load(Ordering::Acquire)
    }

    fn pend_sv(&self) {
        require!(!self.in_switch.swap(true, Ordering::AcqRel), Fault::SwitchReentered);
        self.masked.store(true, Ordering::Release);

        // SAFETY: slots were attached from a 'static kernel
        let slots = unsafe { &*self.slots.load(Ordering::Acquire) };
        let current = slots.current_ptr();
        let next = slots.next_ptr();
        require!(!next.is_null(), Fault::NotStarted);

        if current != next {
            let mut cpu = self.cpu.lock();

            // SAFETY: both pointers come from the kernel registry, and every
            // stack address below was produced by `frame::synthesize` or by an
            // earlier pass through here, so it lies inside its thread's stack
            unsafe {
                if let Some(outgoing) = current.as_ref() {
                    // hardware stacking on exception entry
                    let mut sp = cpu.psp - EXCEPTION_WORDS * WORD;
                    slice::from_raw_parts_mut(sp as *mut StackWord, EXCEPTION_WORDS)
                        .copy_from_slice(&cpu.frame);
                    sp -= CALLEE_WORDS * WORD;
                    slice::from_raw_parts_mut(sp as *mut StackWord, CALLEE_WORDS)
                        .copy_from_slice(&cpu.callee);
                    outgoing.set_saved_sp(sp);
                }

                let mut sp = (*next).saved_sp();
                cpu.callee
                    .copy_from_slice(slice::from_raw_parts(sp as *const StackWord, CALLEE_WORDS));
                sp += CALLEE_WORDS * WORD;
                // exception return
                cpu.frame
                    .copy_from_slice(slice::from_raw_parts(sp as *const StackWord, EXCEPTION_WORDS));
                sp += EXCEPTION_WORDS * WORD;
                cpu.psp = sp;
            }

            slots.set_current(next);
            self.switches.fetch_add(1, Ordering::AcqRel);
        }

        self.masked.store(false, Ordering::Release);
        self.in_switch.store(false, Ordering::Release);
    }
}

impl Default for HostArch {
    fn default() -> Self {
        Self::new()
    }
}

impl Arch for HostArch {
    fn disable_interrupts(&self) {
        self.masked.store(true, Ordering::Release);
    }

    fn enable_interrupts(&self) {
        self.masked.store(false, Ordering::Release);
        if self.slots.load(Ordering::Acquire).is_null() {
            return;
        }
        if self.pending.swap(false, Ordering::AcqRel) {
            self.pend_sv();
        }
    }

    fn interrupts_enabled(&self) -> bool {
        !self.masked.load(Ordering::Acquire)
    }

    fn configure_switch_priority(&self) {
        self.switch_prio_lowest.store(true, Ordering::Release);
    }

    fn attach_switch_slots(&self, slots: &'static SwitchSlots) {
        self.slots
            .store(slots as *const SwitchSlots as *mut SwitchSlots, Ordering::Release);
    }

    fn request_switch(&self) {
        self.pending.store(true, Ordering::Release);
    }
}
