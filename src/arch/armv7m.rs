//! ARMv7-M (Cortex-M3/M4/M7) platform.
//!
//! The switch phase is the PendSV exception, configured at the lowest
//! priority so it tail-chains after SysTick and every device interrupt.
//! Threads run in thread mode on the process stack (PSP); handlers keep
//! using the main stack.
//!
//! Threads must not use the FPU: the switch routine handles the basic
//! 8-word exception frame only.

use super::{Arch, SwitchSlots};
use crate::thread::Tcb;
use core::arch::naked_asm;
use core::ptr::null_mut;
use cortex_m::interrupt;
use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::SCB;
use cortex_m::register::primask;
use portable_atomic::{AtomicPtr, Ordering};

/// Slots of the running kernel, read by `PendSV`.
static SWITCH_SLOTS: AtomicPtr<SwitchSlots> = AtomicPtr::new(null_mut());

/// Lowest configurable exception priority.
const LOWEST_PRIORITY: u8 = 0xFF;

pub struct CortexM;

impl CortexM {
    pub const fn new() -> Self {
        CortexM
    }
}

impl Default for CortexM {
    fn default() -> Self {
        Self::new()
    }
}

impl Arch for CortexM {
    #[inline]
    fn disable_interrupts(&self) {
        interrupt::disable();
    }

    #[inline]
    fn enable_interrupts(&self) {
        // SAFETY: only called when leaving a kernel critical section
        unsafe { interrupt::enable() }
    }

    #[inline]
    fn interrupts_enabled(&self) -> bool {
        primask::read().is_active()
    }

    fn configure_switch_priority(&self) {
        // SAFETY: runs once during single-threaded bring-up; SHPR3 is not
        // touched anywhere else by the kernel
        unsafe {
            let mut cp = cortex_m::Peripherals::steal();
            cp.SCB.set_priority(SystemHandler::PendSV, LOWEST_PRIORITY);
        }
    }

    fn attach_switch_slots(&self, slots: &'static SwitchSlots) {
        SWITCH_SLOTS.store(slots as *const SwitchSlots as *mut SwitchSlots, Ordering::Release);
    }

    #[inline]
    fn request_switch(&self) {
        SCB::set_pendsv();
    }
}

/// Context-switch execution phase.
///
/// Entered by hardware with R0-R3, R12, LR, PC and xPSR of the preempted
/// thread already stacked on the PSP, so only R4-R11 are saved here. Only
/// R0-R3 are used as scratch before R4-R11 are safe on the stack.
#[unsafe(no_mangle)]
#[unsafe(naked)]
unsafe extern "C" fn PendSV() {
    naked_asm!(
        "cpsid   i",
        // r1 = &SwitchSlots, r2 = current, r3 = next
        "ldr     r1, ={slots}",
        "ldr     r1, [r1]",
        "ldr     r2, [r1, #{current}]",
        "ldr     r3, [r1, #{next}]",
        "cmp     r2, r3",
        "bne     1f",
        "cpsie   i",
        "bx      lr",
        "1:",
        // first switch after boot has nothing to save
        "cbz     r2, 2f",
        "mrs     r0, psp",
        "stmdb   r0!, {{r4-r11}}",
        "str     r0, [r2, #{sp}]",
        "2:",
        "ldr     r0, [r3, #{sp}]",
        "ldmia   r0!, {{r4-r11}}",
        "msr     psp, r0",
        "str     r3, [r1, #{current}]",
        "cpsie   i",
        // EXC_RETURN 0xFFFFFFFD: thread mode, process stack
        "mvn     lr, #2",
        "bx      lr",
        slots = sym SWITCH_SLOTS,
        current = const SwitchSlots::CURRENT_OFFSET,
        next = const SwitchSlots::NEXT_OFFSET,
        sp = const Tcb::SP_OFFSET,
    );
}

/// Sleep until the next interrupt. Handy as an idle hook body.
#[inline]
pub fn wait_for_interrupt() {
    cortex_m::asm::wfi();
}
