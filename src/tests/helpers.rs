//! Test helper utilities and common functionality.
//!
//! Every test builds its own leaked kernel on its own [`HostArch`], so tests
//! can run in parallel without sharing any scheduler state.

use crate::arch::frame::StackWord;
use crate::arch::host::HostArch;
use crate::kernel::{Hooks, Kernel};
use crate::sched::Priority;
use std::boxed::Box;
use std::vec;

/// Stack size used by the fixtures, in words.
pub(crate) const STACK_WORDS: usize = 64;

pub(crate) struct NullHooks;

impl Hooks for NullHooks {
    fn on_idle() {}
}

pub(crate) type TestKernel = Kernel<HostArch, NullHooks>;

pub(crate) fn leak_kernel<H: Hooks>() -> &'static Kernel<HostArch, H> {
    Box::leak(Box::new(Kernel::new(HostArch::new())))
}

pub(crate) fn stack(words: usize) -> &'static mut [StackWord] {
    Box::leak(vec![0; words].into_boxed_slice())
}

/// Thread body for fixtures. Never executed by the host platform.
pub(crate) fn spin() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

/// Kernel with idle and `prios` registered, not started.
pub(crate) fn booted(prios: &[Priority]) -> &'static TestKernel {
    let kernel = leak_kernel::<NullHooks>();
    kernel.init(stack(STACK_WORDS));
    for &prio in prios {
        kernel.register(prio, spin, stack(STACK_WORDS));
    }
    kernel
}

/// Kernel with idle and `prios` registered, running its first thread.
pub(crate) fn started(prios: &[Priority]) -> &'static TestKernel {
    let kernel = booted(prios);
    kernel.launch();
    kernel
}
