//! Runtime diagnostics.
//!
//! Counters collected by the main loop.  None of them influence control
//! behaviour; they exist so a developer can tell a healthy loop from one
//! that is losing windows or being woken by interrupt storms.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Main-loop iterations completed.
    pub iterations: u64,
    /// Wakeups from sleep that were not the wake compare.
    pub spurious_wakeups: u64,
    /// Windows overwritten before the main loop consumed them.
    pub dropped_snapshots: u32,
    /// Lines the transport refused.
    pub write_failures: u32,
    /// Failed PWM or indicator pin writes.
    pub actuator_faults: u32,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Average early wakeups per iteration, 0 before the first one.
    pub fn spurious_per_iteration(&self) -> f32 {
        if self.iterations == 0 {
            return 0.0;
        }
        self.spurious_wakeups as f32 / self.iterations as f32
    }
}
