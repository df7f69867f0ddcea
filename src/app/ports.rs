//! Port traits: the boundary between the instrument core and the board.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Instrument (domain)
//! ```
//!
//! Board adapters (real peripherals or the host simulation) implement
//! these traits.  The [`Instrument`](super::service::Instrument) consumes
//! them via generics, so the core never touches registers directly.
//!
//! The PWM output and the tick indicator pin are not ports of their own:
//! they use the `embedded-hal` 1.0 traits
//! [`SetDutyCycle`](embedded_hal::pwm::SetDutyCycle) and
//! [`OutputPin`](embedded_hal::digital::OutputPin).

use crate::error::TransportError;

// ───────────────────────────────────────────────────────────────
// Comparator port (hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Binary HV sense: the divided supply voltage against a bandgap reference.
pub trait Comparator {
    /// `true` when the supply is at or above the target voltage.
    fn above_threshold(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Transport port (host link)
// ───────────────────────────────────────────────────────────────

/// Byte-oriented serial link to the host.
///
/// Only called while the shared link flag says the transport is up.
/// Connect and disconnect are reported separately through
/// [`on_transport_connect`](crate::shared::on_transport_connect) and
/// [`on_transport_disconnect`](crate::shared::on_transport_disconnect).
pub trait Transport {
    /// Next received byte, if one is waiting.  Never blocks.
    fn read_byte(&mut self) -> Option<u8>;

    /// Queue one complete line, including its `\r\n` terminator.
    fn write_line(&mut self, line: &[u8]) -> Result<(), TransportError>;
}

// ───────────────────────────────────────────────────────────────
// Sleep control port (power management / wake timer)
// ───────────────────────────────────────────────────────────────

/// Low-level hooks the [`SleepScheduler`](crate::scheduler::SleepScheduler)
/// drives.
pub trait SleepControl {
    /// Arm the wake compare `offset_ticks` after the current timer count.
    fn arm_wake(&mut self, offset_ticks: u8);

    /// Disarm the wake compare interrupt.
    fn disarm_wake(&mut self);

    /// Idle the CPU until any interrupt has been serviced.
    fn wait_for_interrupt(&mut self);

    /// Power the HV comparator up or down.
    fn set_comparator_enabled(&mut self, enabled: bool);
}
