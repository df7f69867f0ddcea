//! System configuration parameters
//!
//! Control-law constants, timer geometry and power-on mode flags for the
//! Geiger counter.  The defaults reproduce the tuned values of the
//! instrument; nothing is persisted, so the firmware always boots with
//! [`SystemConfig::default()`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// --- PWM ---

/// PWM counter top.  Duty is a compare value in `1..=PWM_TOP - 1`.
pub const PWM_TOP: u16 = 1024;
/// Duty applied at power-on, before the regulator takes over.
pub const INITIAL_DUTY: u16 = 10;

// --- Regulator ---

/// Below-threshold corrections are applied on every Nth regulated iteration.
pub const STEP_GATE: u8 = 10;
/// Consecutive-iteration count at which an at-threshold reading marks the
/// supply as reached and trims the duty down by one.
pub const SETTLE_ITERATIONS: u8 = 100;
/// Upper bound of the low duty zone.
pub const LOW_ZONE_LIMIT: u16 = 100;
/// Upper bound of the mid duty zone.
pub const MID_ZONE_LIMIT: u16 = 500;
/// Coarse step in the low zone (before the threshold was first reached).
pub const COARSE_STEP_LOW: u16 = 15;
/// Coarse step in the mid zone.
pub const COARSE_STEP_MID: u16 = 10;
/// Step in either zone once the threshold has been reached.
pub const FINE_STEP: u16 = 1;
/// The settle trim never takes the duty below this value.
pub const TRIM_FLOOR: u16 = 2;

// --- Timing ---

/// Timer tick length: 1024 prescaler at 16 MHz.
pub const TICK_US: u32 = 64;
/// Window length in ticks (8-bit counter overflow), 16.384 ms.
pub const WINDOW_TICKS: u16 = 256;
/// Wake compare offset in ticks, ~0.96 ms.
pub const WAKE_OFFSET_TICKS: u8 = 15;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- PWM ---
    /// PWM counter top
    pub pwm_top: u16,
    /// Duty cycle at power-on
    pub initial_duty: u16,

    // --- Regulator ---
    pub step_gate: u8,
    pub settle_iterations: u8,
    pub low_zone_limit: u16,
    pub mid_zone_limit: u16,
    pub coarse_step_low: u16,
    pub coarse_step_mid: u16,
    pub fine_step: u16,
    pub trim_floor: u16,

    // --- Timing ---
    /// Microseconds per timer tick
    pub tick_us: u32,
    /// Ticks per sampling window
    pub window_ticks: u16,
    /// Ticks between entering sleep and the wake compare match
    pub wake_offset_ticks: u8,

    // --- Power-on mode flags ---
    pub auto_regulation: bool,
    pub indicator_enabled: bool,
    pub reporting_enabled: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // PWM
            pwm_top: PWM_TOP,
            initial_duty: INITIAL_DUTY,

            // Regulator
            step_gate: STEP_GATE,
            settle_iterations: SETTLE_ITERATIONS,
            low_zone_limit: LOW_ZONE_LIMIT,
            mid_zone_limit: MID_ZONE_LIMIT,
            coarse_step_low: COARSE_STEP_LOW,
            coarse_step_mid: COARSE_STEP_MID,
            fine_step: FINE_STEP,
            trim_floor: TRIM_FLOOR,

            // Timing
            tick_us: TICK_US,
            window_ticks: WINDOW_TICKS,
            wake_offset_ticks: WAKE_OFFSET_TICKS,

            // Mode flags
            auto_regulation: true,
            indicator_enabled: true,
            reporting_enabled: false,
        }
    }
}

impl SystemConfig {
    /// Reject configurations that would break the duty or timing invariants.
    pub fn validate(&self) -> Result<()> {
        if self.pwm_top < 4 {
            return Err(Error::Config("pwm_top must be at least 4"));
        }
        if self.initial_duty < 1 || self.initial_duty >= self.pwm_top {
            return Err(Error::Config("initial_duty must lie in 1..pwm_top"));
        }
        if self.step_gate == 0 {
            return Err(Error::Config("step_gate must be non-zero"));
        }
        if self.low_zone_limit > self.mid_zone_limit {
            return Err(Error::Config("low zone must end below the mid zone"));
        }
        if self.trim_floor < 1 {
            return Err(Error::Config("trim_floor must be at least 1"));
        }
        if self.window_ticks == 0 || self.window_ticks > 256 {
            return Err(Error::Config("window_ticks must lie in 1..=256"));
        }
        if self.wake_offset_ticks == 0 || u16::from(self.wake_offset_ticks) >= self.window_ticks {
            return Err(Error::Config("wake offset must be shorter than a window"));
        }
        Ok(())
    }

    /// Window length in microseconds.
    pub fn window_us(&self) -> u32 {
        u32::from(self.window_ticks) * self.tick_us
    }

    /// Sleep period in microseconds.
    pub fn wake_period_us(&self) -> u32 {
        u32::from(self.wake_offset_ticks) * self.tick_us
    }
}
