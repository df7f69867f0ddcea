//! Main-loop pacing.
//!
//! Every loop iteration ends in [`SleepScheduler::sleep`], which idles the
//! CPU until the dedicated wake compare fires a fixed number of timer ticks
//! later.  Detector edges, window overflows and USB traffic all wake the CPU
//! too; those wakeups are serviced by their ISRs and the scheduler goes
//! straight back to sleep, so exactly one loop body runs per wake period.
//!
//! ```text
//!   loop body ─▶ arm wake ─▶ WFI ─┬─▶ wake flag? ─ yes ─▶ disarm ─▶ loop body
//!                             ▲   │
//!                             └───┴─ no (detector / window / USB)
//! ```

use crate::app::ports::SleepControl;
use crate::shared::SharedState;

/// Wake compare ISR.  Interrupt context.
pub fn on_wake_timer(shared: &SharedState) {
    shared.signal_wake();
}

/// Fixed-period low-power wait.
pub struct SleepScheduler {
    offset_ticks: u8,
}

impl SleepScheduler {
    pub fn new(offset_ticks: u8) -> Self {
        Self { offset_ticks }
    }

    pub fn offset_ticks(&self) -> u8 {
        self.offset_ticks
    }

    /// Sleep until the wake compare fires.  Returns the number of
    /// unrelated interrupts that woke the CPU early.
    ///
    /// The comparator is powered down for the duration.
    pub fn sleep(&self, shared: &SharedState, hw: &mut impl SleepControl) -> u32 {
        hw.set_comparator_enabled(false);
        shared.clear_wake();
        hw.arm_wake(self.offset_ticks);

        let mut early = 0;
        loop {
            hw.wait_for_interrupt();
            if shared.take_wake() {
                break;
            }
            early += 1;
        }

        hw.disarm_wake();
        hw.set_comparator_enabled(true);
        early
    }
}
