//! Bang-bang regulator for the tube high-voltage supply.
//!
//! The only feedback is a comparator telling whether the output is above
//! the target.  While below, the duty is stepped up on every
//! [`STEP_GATE`](crate::config::STEP_GATE)th iteration: coarse steps until
//! the target has been seen once, fine steps afterwards.  While above, the
//! duty is trimmed down by one whenever the iteration counter reaches
//! [`SETTLE_ITERATIONS`](crate::config::SETTLE_ITERATIONS), which keeps
//! the output from creeping upwards.
//!
//! The iteration counter is a wrapping `u8` shared by both branches and is
//! only reset by the trim.  A below-threshold phase that carries it past
//! the settle count lets it run on and wrap before the next trim can fire.

use crate::config::SystemConfig;
use crate::control::duty::DutyCycle;

/// What a single control step did to the duty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    Unchanged,
    Raised { from: u16, to: u16 },
    /// Settle trim.  `first` is set on the step that switched the
    /// regulator from coarse to fine stepping.
    Trimmed { from: u16, to: u16, first: bool },
}

/// Comparator-driven duty regulator.
pub struct VoltageRegulator {
    reached: bool,
    iterations: u8,
    step_gate: u8,
    settle_iterations: u8,
    low_zone_limit: u16,
    mid_zone_limit: u16,
    coarse_step_low: u16,
    coarse_step_mid: u16,
    fine_step: u16,
    trim_floor: u16,
}

impl VoltageRegulator {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            reached: false,
            iterations: 0,
            step_gate: config.step_gate,
            settle_iterations: config.settle_iterations,
            low_zone_limit: config.low_zone_limit,
            mid_zone_limit: config.mid_zone_limit,
            coarse_step_low: config.coarse_step_low,
            coarse_step_mid: config.coarse_step_mid,
            fine_step: config.fine_step,
            trim_floor: config.trim_floor,
        }
    }

    /// Run one control iteration against the latest comparator reading.
    pub fn step(&mut self, above_threshold: bool, duty: &mut DutyCycle) -> Adjustment {
        let from = duty.get();
        let mut adjustment = Adjustment::Unchanged;

        if !above_threshold {
            if self.iterations % self.step_gate == 0 {
                let (low, mid) = if self.reached {
                    (self.fine_step, self.fine_step)
                } else {
                    (self.coarse_step_low, self.coarse_step_mid)
                };
                // Both zones are checked in turn, so a low duty gets both steps.
                if duty.get() < self.low_zone_limit {
                    duty.raise(low);
                }
                if duty.get() < self.mid_zone_limit {
                    duty.raise(mid);
                }
                if duty.get() != from {
                    adjustment = Adjustment::Raised {
                        from,
                        to: duty.get(),
                    };
                }
            }
        } else if self.iterations == self.settle_iterations {
            let first = !self.reached;
            self.reached = true;
            duty.trim(self.trim_floor);
            self.iterations = 0;
            adjustment = Adjustment::Trimmed {
                from,
                to: duty.get(),
                first,
            };
        }

        self.iterations = self.iterations.wrapping_add(1);
        adjustment
    }

    /// Whether the target has been seen and fine stepping is active.
    pub fn reached(&self) -> bool {
        self.reached
    }

    /// Raw iteration counter.
    pub fn iterations(&self) -> u8 {
        self.iterations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PWM_TOP;

    fn setup(start: u16) -> (VoltageRegulator, DutyCycle) {
        (
            VoltageRegulator::new(&SystemConfig::default()),
            DutyCycle::new(start, PWM_TOP),
        )
    }

    #[test]
    fn coarse_step_in_low_zone_applies_both_increments() {
        let (mut reg, mut duty) = setup(10);
        let adj = reg.step(false, &mut duty);
        assert_eq!(adj, Adjustment::Raised { from: 10, to: 35 });
    }

    #[test]
    fn coarse_step_in_mid_zone() {
        let (mut reg, mut duty) = setup(200);
        reg.step(false, &mut duty);
        assert_eq!(duty.get(), 210);
    }

    #[test]
    fn no_step_above_mid_zone() {
        let (mut reg, mut duty) = setup(600);
        assert_eq!(reg.step(false, &mut duty), Adjustment::Unchanged);
        assert_eq!(duty.get(), 600);
    }

    #[test]
    fn steps_only_every_tenth_iteration() {
        let (mut reg, mut duty) = setup(200);
        for _ in 0..10 {
            reg.step(false, &mut duty);
        }
        assert_eq!(duty.get(), 210);
        reg.step(false, &mut duty);
        assert_eq!(duty.get(), 220);
    }

    #[test]
    fn settles_after_hundred_iterations_above() {
        let (mut reg, mut duty) = setup(300);
        for _ in 0..100 {
            assert_eq!(reg.step(true, &mut duty), Adjustment::Unchanged);
        }
        assert!(!reg.reached());

        let adj = reg.step(true, &mut duty);
        assert_eq!(
            adj,
            Adjustment::Trimmed {
                from: 300,
                to: 299,
                first: true
            }
        );
        assert!(reg.reached());
        assert_eq!(reg.iterations(), 1);
    }

    #[test]
    fn trims_once_per_hundred_after_settling() {
        let (mut reg, mut duty) = setup(300);
        let mut trims = 0;
        for _ in 0..301 {
            if let Adjustment::Trimmed { first, .. } = reg.step(true, &mut duty) {
                assert_eq!(first, trims == 0);
                trims += 1;
            }
        }
        assert_eq!(trims, 3);
        assert_eq!(duty.get(), 297);
    }

    #[test]
    fn fine_steps_after_reaching_threshold() {
        let (mut reg, mut duty) = setup(50);
        for _ in 0..101 {
            reg.step(true, &mut duty);
        }
        assert!(reg.reached());
        assert_eq!(duty.get(), 49);

        // Counter is at 1; run until the next gated iteration.
        for _ in 0..9 {
            reg.step(false, &mut duty);
        }
        assert_eq!(duty.get(), 49);
        assert_eq!(reg.step(false, &mut duty), Adjustment::Raised { from: 49, to: 51 });
    }

    #[test]
    fn reached_never_reverts_to_coarse() {
        let (mut reg, mut duty) = setup(50);
        for _ in 0..101 {
            reg.step(true, &mut duty);
        }
        for _ in 0..1000 {
            reg.step(false, &mut duty);
            assert!(reg.reached());
        }
    }

    #[test]
    fn trim_floor_is_two() {
        let (mut reg, mut duty) = setup(2);
        for _ in 0..101 {
            reg.step(true, &mut duty);
        }
        assert_eq!(duty.get(), 2);
    }

    #[test]
    fn counter_keeps_running_through_below_phase_and_wraps() {
        let (mut reg, mut duty) = setup(900);
        // 150 iterations below carries the counter past the settle count.
        for _ in 0..150 {
            reg.step(false, &mut duty);
        }
        assert_eq!(reg.iterations(), 150);

        // Above from here: no trim until the counter wraps back round to 100.
        let mut steps = 0;
        loop {
            steps += 1;
            if let Adjustment::Trimmed { .. } = reg.step(true, &mut duty) {
                break;
            }
        }
        assert_eq!(steps, 256 - 150 + 100 + 1);
    }

    #[test]
    fn raise_clamps_below_top() {
        let cfg = SystemConfig {
            mid_zone_limit: 2000,
            ..SystemConfig::default()
        };
        let mut reg = VoltageRegulator::new(&cfg);
        let mut duty = DutyCycle::new(1020, PWM_TOP);
        reg.step(false, &mut duty);
        assert_eq!(duty.get(), 1023);
    }
}
