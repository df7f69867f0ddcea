//! Hardware adapter: bridges the ESP32-S3 peripherals to the port traits.
//!
//! [`EspBoard`] implements [`Comparator`], [`Transport`] and
//! [`SleepControl`]; [`LedcPwm`] and [`GpioOutput`] implement the
//! `embedded-hal` output traits the [`Instrument`](crate::app::service::Instrument)
//! owns.  This is the only module besides `drivers::hw_*` that touches
//! actual hardware.

use embedded_hal::digital::{self, OutputPin};
use embedded_hal::pwm::{self, SetDutyCycle};
use esp_idf_svc::sys::*;
use log::warn;

use crate::app::ports::{Comparator, SleepControl, Transport};
use crate::drivers::{hw_init, hw_timer};
use crate::error::TransportError;
use crate::pins;
use crate::shared::{SharedState, on_transport_connect, on_transport_disconnect};

// ── HV PWM ────────────────────────────────────────────────────

/// LEDC channel driving the boost converter gate.
pub struct LedcPwm {
    channel: u32,
    top: u16,
}

impl LedcPwm {
    pub fn new(channel: u32, resolution_bits: u32) -> Self {
        Self {
            channel,
            top: 1u16 << resolution_bits,
        }
    }
}

impl pwm::ErrorType for LedcPwm {
    type Error = pwm::ErrorKind;
}

impl SetDutyCycle for LedcPwm {
    fn max_duty_cycle(&self) -> u16 {
        self.top
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), pwm::ErrorKind> {
        if hw_init::ledc_set(self.channel, u32::from(duty)) == ESP_OK as i32 {
            Ok(())
        } else {
            Err(pwm::ErrorKind::Other)
        }
    }
}

// ── GPIO output ───────────────────────────────────────────────

pub struct GpioOutput(i32);

impl GpioOutput {
    pub fn new(pin: i32) -> Self {
        Self(pin)
    }
}

impl digital::ErrorType for GpioOutput {
    type Error = digital::ErrorKind;
}

impl OutputPin for GpioOutput {
    fn set_low(&mut self) -> Result<(), digital::ErrorKind> {
        gpio_result(hw_init::gpio_write(self.0, false))
    }

    fn set_high(&mut self) -> Result<(), digital::ErrorKind> {
        gpio_result(hw_init::gpio_write(self.0, true))
    }
}

fn gpio_result(rc: i32) -> Result<(), digital::ErrorKind> {
    if rc == ESP_OK as i32 { Ok(()) } else { Err(digital::ErrorKind::Other) }
}

// ── Board ─────────────────────────────────────────────────────

/// Comparator input, USB serial link and sleep hooks.
pub struct EspBoard {
    shared: &'static SharedState,
    link_up: bool,
}

impl EspBoard {
    pub fn new(shared: &'static SharedState) -> Self {
        Self {
            shared,
            link_up: false,
        }
    }

    /// Forward USB connect/disconnect to the shared link flag.  Call once
    /// per main-loop iteration.
    pub fn poll_link(&mut self) {
        // SAFETY: status query on the installed USB serial driver.
        let up = unsafe { usb_serial_jtag_is_connected() };
        if up != self.link_up {
            self.link_up = up;
            if up {
                on_transport_connect(self.shared);
            } else {
                on_transport_disconnect(self.shared);
            }
        }
    }
}

impl Comparator for EspBoard {
    fn above_threshold(&mut self) -> bool {
        hw_init::gpio_read(pins::HV_SENSE_GPIO)
    }
}

impl Transport for EspBoard {
    fn read_byte(&mut self) -> Option<u8> {
        let mut byte = 0u8;
        // SAFETY: one-byte buffer, zero timeout.
        let n = unsafe { usb_serial_jtag_read_bytes((&raw mut byte).cast(), 1, 0) };
        (n == 1).then_some(byte)
    }

    fn write_line(&mut self, line: &[u8]) -> Result<(), TransportError> {
        if !self.shared.transport_up() {
            return Err(TransportError::Disconnected);
        }
        // SAFETY: the driver copies `line` into its ring buffer before returning.
        let n = unsafe { usb_serial_jtag_write_bytes(line.as_ptr().cast(), line.len(), 0) };
        if n < 0 || n as usize != line.len() {
            return Err(TransportError::BufferFull);
        }
        Ok(())
    }
}

impl SleepControl for EspBoard {
    fn arm_wake(&mut self, offset_ticks: u8) {
        hw_timer::arm_wake(offset_ticks);
    }

    fn disarm_wake(&mut self) {
        hw_timer::disarm_wake();
    }

    fn wait_for_interrupt(&mut self) {
        hw_timer::wait_for_notification();
    }

    fn set_comparator_enabled(&mut self, enabled: bool) {
        let rc = hw_init::gpio_write(pins::HV_SENSE_EN_GPIO, enabled);
        if rc != ESP_OK as i32 {
            warn!("comparator enable={} failed (rc={})", enabled, rc);
        }
    }
}
