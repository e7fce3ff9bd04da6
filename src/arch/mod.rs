//! Platform abstraction for interrupt masking and context switching.
//!
//! Context switching is split in two. The scheduler only *requests* a
//! switch by writing the next thread into [`SwitchSlots`] and pending the
//! switch phase; the platform *performs* it later at the lowest exception
//! priority, once every other handler has finished. The platform's switch
//! routine is the only code that touches machine stack pointers.

use crate::thread::Tcb;
use core::marker::PhantomData;
use core::mem::{offset_of, size_of};
use core::ptr::null_mut;
use portable_atomic::{AtomicPtr, Ordering};
use static_assertions::const_assert_eq;

pub mod frame;

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod armv7m;

#[cfg(any(test, feature = "std-shim"))]
pub mod host;

/// Platform services the kernel depends on.
///
/// # Safety contract
///
/// `request_switch` must be idempotent while a switch is pending, and the
/// switch phase it pends must run only after all higher-priority activity
/// has completed. The switch phase must implement the protocol documented
/// on [`SwitchSlots`].
pub trait Arch: Sync {
    /// Mask interrupts on the current core.
    fn disable_interrupts(&self);

    /// Unmask interrupts on the current core.
    fn enable_interrupts(&self);

    /// Returns `true` if interrupts are currently unmasked.
    fn interrupts_enabled(&self) -> bool;

    /// Make the switch phase the lowest-priority exception in the system.
    fn configure_switch_priority(&self);

    /// Hand the switch phase the slots it works on. Called once, at init.
    fn attach_switch_slots(&self, slots: &'static SwitchSlots);

    /// Pend the switch phase.
    fn request_switch(&self);
}

/// Interrupt mask held for the lifetime of the guard.
///
/// Kernel operations that touch shared scheduler state take a reference to
/// a guard as proof that they run masked. Dropping the guard restores the
/// mask state found at creation, so guards nest and are safe to take from
/// interrupt handlers.
pub struct IrqGuard<'a, A: Arch> {
    arch: &'a A,
    restore: bool,
    _not_send: PhantomData<*mut ()>,
}

impl<'a, A: Arch> IrqGuard<'a, A> {
    pub fn new(arch: &'a A) -> Self {
        let restore = arch.interrupts_enabled();
        arch.disable_interrupts();
        Self {
            arch,
            restore,
            _not_send: PhantomData,
        }
    }

    pub fn arch(&self) -> &'a A {
        self.arch
    }
}

impl<A: Arch> Drop for IrqGuard<'_, A> {
    fn drop(&mut self) {
        if self.restore {
            self.arch.enable_interrupts();
        }
    }
}

/// The `Current`/`Next` thread pair shared with the switch phase.
///
/// Protocol of the switch phase, run with interrupts masked:
///
/// 1. If `next == current`, return untouched.
/// 2. If `current` is non-null, push R4-R11 on its process stack and store
///    the resulting stack pointer at offset 0 of its TCB.
/// 3. Load the stack pointer from `next`'s TCB, pop R4-R11, set
///    `current = next`, and exception-return on the process stack.
///
/// `current` is written only by the switch phase and `next` only by the
/// scheduler. Both only ever point into the registry of the kernel that owns
/// these slots.
#[repr(C)]
pub struct SwitchSlots {
    current: AtomicPtr<Tcb>,
    next: AtomicPtr<Tcb>,
}

const_assert_eq!(offset_of!(SwitchSlots, current), 0);
const_assert_eq!(offset_of!(SwitchSlots, next), size_of::<usize>());

impl SwitchSlots {
    pub const CURRENT_OFFSET: usize = offset_of!(SwitchSlots, current);
    pub const NEXT_OFFSET: usize = offset_of!(SwitchSlots, next);

    pub const fn new() -> Self {
        Self {
            current: AtomicPtr::new(null_mut()),
            next: AtomicPtr::new(null_mut()),
        }
    }

    /// Thread that owns the CPU, `None` before the first switch.
    pub fn current(&self) -> Option<&Tcb> {
        // SAFETY: only pointers into the owning kernel's registry are stored,
        // and registry entries are never removed
        unsafe { self.current.load(Ordering::Acquire).as_ref() }
    }

    /// Thread most recently selected by the scheduler.
    pub fn next(&self) -> Option<&Tcb> {
        // SAFETY: as for `current`
        unsafe { self.next.load(Ordering::Acquire).as_ref() }
    }

    pub(crate) fn set_next(&self, tcb: &Tcb) {
        self.next.store(tcb.as_ptr(), Ordering::Release);
    }

    pub(crate) fn current_ptr(&self) -> *mut Tcb {
        self.current.load(Ordering::Acquire)
    }

    #[cfg(any(test, feature = "std-shim"))]
    pub(crate) fn next_ptr(&self) -> *mut Tcb {
        self.next.load(Ordering::Acquire)
    }

    #[cfg(any(test, feature = "std-shim"))]
    pub(crate) fn set_current(&self, tcb: *mut Tcb) {
        self.current.store(tcb, Ordering::Release);
    }
}

impl Default for SwitchSlots {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub use armv7m::CortexM as DefaultArch;

#[cfg(all(
    not(all(target_arch = "arm", target_os = "none")),
    any(test, feature = "std-shim")
))]
pub use host::HostArch as DefaultArch;

#[cfg(all(
    not(all(target_arch = "arm", target_os = "none")),
    not(any(test, feature = "std-shim"))
))]
compile_error!("prio-kernel targets bare-metal ARMv7-M. Use --target thumbv7m-none-eabi (or thumbv7em) or enable the std-shim feature for host builds.");
