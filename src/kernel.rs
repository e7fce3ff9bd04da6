//! Kernel object tying the scheduler to a platform.
//!
//! A [`Kernel`] is normally a `static`, built with the `const`
//! constructor and shared by every thread and interrupt handler:
//!
//! ```ignore
//! static KERNEL: Kernel<CortexM, Board> = Kernel::new(CortexM::new());
//! ```

use crate::arch::frame::{self, StackWord};
use crate::arch::{Arch, IrqGuard};
use crate::errors::{fault, Fault};
use crate::sched::{Priority, PrioritySet, Scheduler, SetSnapshot, IDLE_PRIORITY};
use crate::thread::{thread_returned, Tcb, ThreadEntry};
use crate::time::{TickCounter, Ticks};
use core::marker::PhantomData;

/// Board callbacks.
pub trait Hooks {
    /// Called over and over by the idle thread. Must return and must never
    /// call [`Kernel::delay`].
    fn on_idle();

    /// Called once by [`Kernel::run`] before the first thread is scheduled.
    /// Boards configure and start their tick interrupt here.
    fn on_startup() {}
}

fn idle_main<H: Hooks>() -> ! {
    loop {
        H::on_idle();
    }
}

/// Main kernel handle.
///
/// # Type Parameters
///
/// * `A` - Platform implementation
/// * `H` - Board callbacks
pub struct Kernel<A: Arch, H: Hooks> {
    arch: A,
    sched: Scheduler,
    uptime: TickCounter,
    _hooks: PhantomData<fn() -> H>,
}

impl<A: Arch, H: Hooks> Kernel<A, H> {
    pub const fn new(arch: A) -> Self {
        Self {
            arch,
            sched: Scheduler::new(),
            uptime: TickCounter::new(),
            _hooks: PhantomData,
        }
    }

    pub fn arch(&self) -> &A {
        &self.arch
    }

    /// Prepare the switch phase and register the idle thread on
    /// `idle_stack`.
    ///
    /// Must run once during bring-up, before [`Kernel::run`].
    pub fn init(&'static self, idle_stack: &'static mut [StackWord]) -> &'static Tcb {
        log::info!("kernel init");
        self.arch.configure_switch_priority();
        self.arch.attach_switch_slots(self.sched.switch_slots());
        self.register(IDLE_PRIORITY, idle_main::<H>, idle_stack)
    }

    /// Register a thread at `priority`, running `entry` on `stack`.
    ///
    /// Boot-time only. Faults if `priority` exceeds `MAX_PRIO`, is already
    /// taken, or if `stack` cannot hold the initial frame.
    pub fn register(
        &self,
        priority: Priority,
        entry: ThreadEntry,
        stack: &'static mut [StackWord],
    ) -> &Tcb {
        let irq = IrqGuard::new(&self.arch);
        // check before painting the stack of a thread we would reject
        self.sched.registry().check_free(priority);

        let ctx = frame::synthesize(
            stack,
            entry as *const () as usize,
            thread_returned as *const () as usize,
        );
        let tcb = self.sched.register(Tcb::new(priority, ctx), &irq);
        drop(irq);

        log::debug!(
            "registered priority {} with {} stack words",
            priority,
            ctx.bounds.words()
        );
        tcb
    }

    /// Start scheduling. Never returns.
    pub fn run(&'static self) -> ! {
        self.launch();
        fault(Fault::RunReturned)
    }

    /// Everything `run` does short of giving up control. On hardware the
    /// first switch happens inside the final unmask and never comes back.
    pub(crate) fn launch(&self) {
        log::info!("kernel run");
        H::on_startup();

        self.arch.disable_interrupts();
        let irq = IrqGuard::new(&self.arch);
        self.sched.select_and_request(&irq);
        drop(irq);
        self.arch.enable_interrupts();
    }

    /// Block the calling thread for `ticks` ticks.
    ///
    /// Returns once the delay has expired and the thread has been switched
    /// back in. Faults when called from the idle thread, before
    /// [`Kernel::run`], or with `ticks == 0`.
    pub fn delay(&self, ticks: Ticks) {
        let irq = IrqGuard::new(&self.arch);
        self.sched.block_current(ticks, &irq);
        // the pended switch runs as soon as the mask is released
        drop(irq);
    }

    /// Advance time by one tick. Does not reschedule.
    ///
    /// Returns the priorities that became ready.
    pub fn tick(&self) -> PrioritySet {
        let irq = IrqGuard::new(&self.arch);
        self.uptime.advance();
        self.sched.tick(&irq)
    }

    /// Re-run priority selection, pending a switch if a different thread
    /// should run. Returns the selected priority.
    pub fn reschedule(&self) -> Priority {
        let irq = IrqGuard::new(&self.arch);
        self.sched.select_and_request(&irq)
    }

    /// Periodic interrupt body: one tick, then a reschedule, in a single
    /// critical section.
    pub fn on_tick_interrupt(&self) -> Priority {
        let irq = IrqGuard::new(&self.arch);
        self.uptime.advance();
        self.sched.tick(&irq);
        self.sched.select_and_request(&irq)
    }

    /// Ticks since boot.
    pub fn uptime(&self) -> u32 {
        self.uptime.ticks()
    }

    pub fn sets(&self) -> SetSnapshot {
        let irq = IrqGuard::new(&self.arch);
        self.sched.snapshot(&irq)
    }

    pub fn ready_set(&self) -> PrioritySet {
        self.sets().ready
    }

    pub fn delayed_set(&self) -> PrioritySet {
        self.sets().delayed
    }

    /// Priority of the running thread, `None` before the first switch.
    pub fn current_priority(&self) -> Option<Priority> {
        self.sched.current_priority()
    }

    /// Priority last selected to run.
    pub fn next_priority(&self) -> Option<Priority> {
        self.sched.next_priority()
    }

    pub fn thread(&self, priority: Priority) -> Option<&Tcb> {
        self.sched.registry().get(priority)
    }

    pub fn is_registered(&self, priority: Priority) -> bool {
        self.sched.registry().is_registered(priority)
    }

    /// Remaining delay of the thread at `priority`.
    pub fn timeout_of(&self, priority: Priority) -> Option<Ticks> {
        self.thread(priority).map(Tcb::timeout)
    }

    /// Never-written words at the bottom of a thread's stack.
    pub fn stack_headroom(&self, priority: Priority) -> Option<usize> {
        self.thread(priority).map(Tcb::stack_headroom)
    }
}
