//! Audible/visible tick indicator.
//!
//! A single output pin (piezo driver or LED) that is raised for at most one
//! main-loop iteration per detected pulse.  The driver only remembers what
//! it last wrote; gating on the host-controlled enable flag is the
//! [`Instrument`](crate::app::service::Instrument)'s job.

use embedded_hal::digital::OutputPin;

use crate::error::ActuatorError;

pub struct TickIndicator<P> {
    pin: P,
    asserted: bool,
}

impl<P: OutputPin> TickIndicator<P> {
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            asserted: false,
        }
    }

    pub fn assert(&mut self) -> Result<(), ActuatorError> {
        self.pin
            .set_high()
            .map_err(|_| ActuatorError::GpioWriteFailed)?;
        self.asserted = true;
        Ok(())
    }

    /// Drive the pin low.  Always writes, even if already low.
    pub fn clear(&mut self) -> Result<(), ActuatorError> {
        self.asserted = false;
        self.pin
            .set_low()
            .map_err(|_| ActuatorError::GpioWriteFailed)
    }

    pub fn is_asserted(&self) -> bool {
        self.asserted
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }
}
