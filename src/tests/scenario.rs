//! End-to-end scheduling scenarios, including the register traffic of the
//! switch phase.

#[cfg(test)]
mod scenario_tests {
    use crate::arch::frame::{exception, StackWord, CALLEE_WORDS, EXCEPTION_WORDS, XPSR_THUMB};
    use crate::tests::helpers::*;
    use crate::thread::{thread_returned, ThreadEntry};
    use core::mem::size_of;

    const WORD: usize = size_of::<StackWord>();

    #[test]
    fn test_delay_and_wake_cycle() {
        let kernel = started(&[1, 2]);
        assert_eq!(kernel.current_priority(), Some(2));

        kernel.delay(3);
        assert_eq!(kernel.current_priority(), Some(1));
        assert_eq!(kernel.ready_set().bits(), 0b01);
        assert_eq!(kernel.delayed_set().bits(), 0b10);

        assert_eq!(kernel.on_tick_interrupt(), 1);
        assert_eq!(kernel.timeout_of(2), Some(2));
        assert_eq!(kernel.on_tick_interrupt(), 1);
        assert_eq!(kernel.timeout_of(2), Some(1));
        assert!(kernel.delayed_set().contains(2));

        assert_eq!(kernel.on_tick_interrupt(), 2);
        assert_eq!(kernel.current_priority(), Some(2));
        assert_eq!(kernel.timeout_of(2), Some(0));
        assert!(kernel.delayed_set().is_empty());
        assert_eq!(kernel.ready_set().bits(), 0b11);
    }

    #[test]
    fn test_delay_expires_after_exact_ticks() {
        for n in [1u32, 2, 5, 17] {
            let kernel = started(&[6]);
            kernel.delay(n);
            for _ in 1..n {
                assert!(kernel.tick().is_empty());
                assert!(kernel.delayed_set().contains(6));
            }
            assert!(kernel.tick().contains(6));
            assert!(kernel.ready_set().contains(6));
        }
    }

    #[test]
    fn test_idle_runs_while_everything_sleeps() {
        let kernel = started(&[1, 2]);
        kernel.delay(2);
        kernel.delay(4);
        assert_eq!(kernel.current_priority(), Some(0));
        assert!(kernel.ready_set().is_empty());

        kernel.on_tick_interrupt();
        assert_eq!(kernel.current_priority(), Some(0));
        kernel.on_tick_interrupt();
        assert_eq!(kernel.current_priority(), Some(2));
        assert_eq!(kernel.timeout_of(1), Some(2));
    }

    #[test]
    fn test_simultaneous_wakeups_pick_highest() {
        let kernel = started(&[3, 5, 8]);
        kernel.delay(2);
        kernel.delay(2);
        kernel.delay(2);
        assert_eq!(kernel.current_priority(), Some(0));

        kernel.on_tick_interrupt();
        let woken = kernel.tick();
        assert_eq!(woken.bits(), 0b1001_0100);
        assert_eq!(kernel.reschedule(), 8);
    }

    #[test]
    fn test_noop_switch_keeps_saved_stack_pointers() {
        let kernel = started(&[3]);
        let running_sp = kernel.thread(3).unwrap().saved_sp();
        let idle_sp = kernel.thread(0).unwrap().saved_sp();
        let switches = kernel.arch().switch_count();
        let cpu = kernel.arch().cpu();

        kernel.reschedule();
        kernel.on_tick_interrupt();

        assert_eq!(kernel.thread(3).unwrap().saved_sp(), running_sp);
        assert_eq!(kernel.thread(0).unwrap().saved_sp(), idle_sp);
        assert_eq!(kernel.arch().switch_count(), switches);
        assert_eq!(kernel.arch().cpu(), cpu);
    }

    #[test]
    fn test_first_switch_enters_thread() {
        let kernel = booted(&[]);
        let entry: ThreadEntry = spin;
        let tcb = kernel.register(5, entry, stack(STACK_WORDS));
        kernel.launch();

        let cpu = kernel.arch().cpu();
        assert_eq!(cpu.frame[exception::PC], entry as *const () as usize & !1);
        assert_eq!(cpu.frame[exception::LR], thread_returned as *const () as usize);
        assert_eq!(cpu.frame[exception::XPSR], XPSR_THUMB);
        assert_eq!(cpu.frame[exception::R12], 0xC);
        assert_eq!(cpu.callee, [4, 5, 6, 7, 8, 9, 10, 11]);
        assert_eq!(cpu.psp, tcb.stack_bounds().top);
    }

    #[test]
    fn test_context_round_trip() {
        let kernel = started(&[1, 2]);
        let arch = kernel.arch();
        let hi = kernel.thread(2).unwrap();
        let lo = kernel.thread(1).unwrap();

        let hi_callee = [0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB];
        let hi_frame = [0x10, 0x11, 0x12, 0x13, 0x1C, 0x1E, 0x2000, XPSR_THUMB | 0x3];
        arch.set_registers(hi_callee, hi_frame);

        kernel.delay(1);
        assert_eq!(kernel.current_priority(), Some(1));
        let outgoing_sp = hi.stack_bounds().top - (CALLEE_WORDS + EXCEPTION_WORDS) * WORD;
        assert_eq!(hi.saved_sp(), outgoing_sp);
        assert_eq!(arch.cpu().callee, [4, 5, 6, 7, 8, 9, 10, 11]);
        assert_eq!(arch.cpu().psp, lo.stack_bounds().top);

        let lo_callee = [1, 2, 3, 4, 5, 6, 7, 8];
        let lo_frame = [0xA0, 0xA1, 0xA2, 0xA3, 0xAC, 0xAE, 0x3000, XPSR_THUMB];
        arch.set_registers(lo_callee, lo_frame);

        // wakes priority 2, which preempts 1
        kernel.on_tick_interrupt();
        assert_eq!(kernel.current_priority(), Some(2));
        let cpu = arch.cpu();
        assert_eq!(cpu.callee, hi_callee);
        assert_eq!(cpu.frame, hi_frame);
        assert_eq!(cpu.psp, hi.stack_bounds().top);

        kernel.delay(1);
        let cpu = arch.cpu();
        assert_eq!(kernel.current_priority(), Some(1));
        assert_eq!(cpu.callee, lo_callee);
        assert_eq!(cpu.frame, lo_frame);
        assert_eq!(cpu.psp, lo.stack_bounds().top);
    }

    #[test]
    fn test_switches_leave_headroom_alone() {
        let kernel = started(&[1, 2]);
        let headroom = kernel.stack_headroom(2);
        for _ in 0..4 {
            kernel.delay(1);
            kernel.on_tick_interrupt();
        }
        assert_eq!(kernel.current_priority(), Some(2));
        assert_eq!(kernel.stack_headroom(2), headroom);
        assert_eq!(kernel.stack_headroom(1), headroom);
    }
}
