//! Boost converter PWM duty.
//!
//! The duty is the compare value of the PWM timer.  It may never reach 0
//! (gate never switches, supply collapses) nor the counter top (gate never
//! turns off), so every mutation saturates into `1..=top - 1`.

/// PWM compare value, always within `1..=max()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyCycle {
    value: u16,
    max: u16,
}

impl DutyCycle {
    /// Create a duty for a PWM with counter top `top`, clamping `value`
    /// into range.
    pub fn new(value: u16, top: u16) -> Self {
        let max = top.saturating_sub(1).max(1);
        Self {
            value: value.clamp(1, max),
            max,
        }
    }

    pub fn get(self) -> u16 {
        self.value
    }

    /// Largest allowed compare value (`top - 1`).
    pub fn max(self) -> u16 {
        self.max
    }

    /// Add `step`, saturating at `top - 1`.
    pub fn raise(&mut self, step: u16) {
        self.value = self.value.saturating_add(step).min(self.max);
    }

    /// Subtract `step`, saturating at 1.
    pub fn lower(&mut self, step: u16) {
        self.value = self.value.saturating_sub(step).max(1);
    }

    /// Drop by one unless already at or below `floor`.
    pub fn trim(&mut self, floor: u16) {
        if self.value > floor {
            self.value -= 1;
        }
    }
}
