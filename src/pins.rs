//! GPIO / peripheral pin assignments for the Geiger counter board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Tube pulse input
// ---------------------------------------------------------------------------

/// Detector pulse, shaped by the anode transistor.  Falling edge = one event.
pub const DETECTOR_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// HV boost converter
// ---------------------------------------------------------------------------

/// Boost converter gate drive (LEDC channel 0).
pub const HV_PWM_GPIO: i32 = 7;
/// Output of the external HV comparator.  HIGH = supply at or above target.
pub const HV_SENSE_GPIO: i32 = 5;
/// Comparator and reference supply enable (active HIGH).
pub const HV_SENSE_EN_GPIO: i32 = 6;

// ---------------------------------------------------------------------------
// Tick indicator
// ---------------------------------------------------------------------------

/// Piezo driver transistor.
pub const INDICATOR_GPIO: i32 = 15;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC resolution.  10 bits gives a counter top of 1024.
pub const HV_PWM_RESOLUTION_BITS: u32 = 10;
/// 16 MHz / 1024: the switching frequency the inductor was sized for.
pub const HV_PWM_FREQ_HZ: u32 = 15_625;
pub const LEDC_CH_HV: u32 = 0;
