#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![forbid(unreachable_pub)]

//! Preemptive fixed-priority scheduler kernel for single-core Cortex-M.
//!
//! Threads are registered once at boot, each at its own priority in
//! `0..=32`; priority 0 is the idle thread. The highest-priority ready
//! thread always runs. Threads leave the ready set only by calling
//! [`Kernel::delay`] and come back when the periodic tick counts their
//! delay down to zero.
//!
//! # Target Platform
//!
//! - **Architecture**: ARMv7-M / ARMv7E-M (Cortex-M3, M4, M7), no FPU context
//! - **Environment**: bare-metal, no heap
//!
//! # Features
//!
//! - `std-shim`: use the simulated host platform outside of tests
//!
//! # Quick Start
//!
//! ```ignore
//! use prio_kernel::{CortexM, Hooks, Kernel};
//!
//! struct Board;
//!
//! impl Hooks for Board {
//!     fn on_idle() {
//!         prio_kernel::arch::armv7m::wait_for_interrupt();
//!     }
//!
//!     fn on_startup() {
//!         // configure SysTick for 1 kHz and enable it
//!     }
//! }
//!
//! static KERNEL: Kernel<CortexM, Board> = Kernel::new(CortexM::new());
//!
//! fn blinky() -> ! {
//!     loop {
//!         toggle_led();
//!         KERNEL.delay(500);
//!     }
//! }
//!
//! #[exception]
//! fn SysTick() {
//!     KERNEL.on_tick_interrupt();
//! }
//!
//! #[entry]
//! fn main() -> ! {
//!     let idle_stack = cortex_m::singleton!(: [usize; 64] = [0; 64]).unwrap();
//!     let blinky_stack = cortex_m::singleton!(: [usize; 256] = [0; 256]).unwrap();
//!
//!     KERNEL.init(idle_stack);
//!     KERNEL.register(1, blinky, blinky_stack);
//!     KERNEL.run()
//! }
//! ```
//!
//! # Architecture
//!
//! - [`sched`]: priority bit-sets, thread registry, selection and tick logic
//! - [`thread`]: thread control blocks
//! - [`arch`]: interrupt masking, initial frame synthesis and the
//!   two-phase context switch (request, then PendSV)
//! - [`kernel`]: the [`Kernel`] object, bootstrap and the thread API
//! - [`errors`]: fatal faults

pub mod arch;
pub mod errors;
pub mod kernel;
pub mod sched;
pub mod thread;
pub mod time;

#[cfg(test)]
extern crate std;

#[cfg(test)]
mod tests;

// Panic handler for bare-metal
#[cfg(all(not(test), target_os = "none"))]
use core::panic::PanicInfo;

#[cfg(all(not(test), target_os = "none"))]
#[panic_handler]
fn panic(_info: &PanicInfo) -> ! {
    // On fault, mask interrupts so no further switch can run, then halt
    #[cfg(target_arch = "arm")]
    cortex_m::interrupt::disable();
    loop {
        #[cfg(target_arch = "arm")]
        cortex_m::asm::wfi();
        #[cfg(not(target_arch = "arm"))]
        core::hint::spin_loop();
    }
}

// ============================================================================
// Public API
// ============================================================================

// Platform
pub use arch::{Arch, DefaultArch, IrqGuard, SwitchSlots};

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub use arch::armv7m::CortexM;

#[cfg(any(test, feature = "std-shim"))]
pub use arch::host::HostArch;

// Kernel
pub use kernel::{Hooks, Kernel};

// Scheduling
pub use sched::{Priority, PrioritySet, IDLE_PRIORITY, MAX_PRIO};

// Threads
pub use thread::{Tcb, ThreadEntry};

// Time
pub use time::{millis_to_ticks, TickCounter, Ticks};

// Errors
pub use errors::Fault;
