//! Instrument service, the hexagonal core.
//!
//! [`Instrument`] owns the HV duty, the regulator, the sleep scheduler, the
//! mode flags and the two outputs (PWM and tick indicator).  Everything
//! else it touches is passed in per call: the interrupt-shared state and a
//! board implementing the [`Comparator`], [`Transport`] and
//! [`SleepControl`] ports.
//!
//! ```text
//!  Comparator ──▶ ┌──────────────────────────────┐ ──▶ SetDutyCycle (HV PWM)
//!  Transport  ◀─▶ │          Instrument          │ ──▶ OutputPin (indicator)
//!  SharedState ─▶ │ commands · regulator · sleep │ ──▶ SleepControl
//!                 └──────────────────────────────┘
//! ```
//!
//! One call to [`Instrument::run_iteration`] is one pass of the firmware
//! main loop:
//!
//! 1. host I/O (one command byte, then a pending window report), only
//!    while the link is up
//! 2. one regulator step, only while auto-regulation is enabled
//! 3. consume a pending tick request, raising the indicator if enabled
//! 4. sleep until the wake compare fires
//! 5. lower the indicator

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use log::{debug, info, trace, warn};

use crate::config::SystemConfig;
use crate::control::duty::DutyCycle;
use crate::control::regulator::{Adjustment, VoltageRegulator};
use crate::diagnostics::Diagnostics;
use crate::drivers::indicator::TickIndicator;
use crate::error::{ActuatorError, Error, Result};
use crate::scheduler::SleepScheduler;
use crate::shared::SharedState;
use crate::window::take_snapshot;

use super::commands::Command;
use super::events::Reply;
use super::ports::{Comparator, SleepControl, Transport};

/// Host-controlled switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeFlags {
    pub auto_regulation: bool,
    pub indicator_enabled: bool,
    pub reporting: bool,
}

impl From<&SystemConfig> for ModeFlags {
    fn from(config: &SystemConfig) -> Self {
        Self {
            auto_regulation: config.auto_regulation,
            indicator_enabled: config.indicator_enabled,
            reporting: config.reporting_enabled,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Instrument
// ───────────────────────────────────────────────────────────────

pub struct Instrument<P, L> {
    config: SystemConfig,
    duty: DutyCycle,
    regulator: VoltageRegulator,
    scheduler: SleepScheduler,
    flags: ModeFlags,
    pwm: P,
    indicator: TickIndicator<L>,
    diagnostics: Diagnostics,
    link_up: bool,
}

impl<P: SetDutyCycle, L: OutputPin> Instrument<P, L> {
    /// Validate `config` and take ownership of the outputs.
    ///
    /// Nothing is written to the hardware until [`start`](Self::start).
    pub fn new(config: SystemConfig, pwm: P, indicator_pin: L) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            duty: DutyCycle::new(config.initial_duty, config.pwm_top),
            regulator: VoltageRegulator::new(&config),
            scheduler: SleepScheduler::new(config.wake_offset_ticks),
            flags: ModeFlags::from(&config),
            pwm,
            indicator: TickIndicator::new(indicator_pin),
            diagnostics: Diagnostics::new(),
            link_up: false,
            config,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Drive the outputs to their power-on state.
    pub fn start(&mut self) -> Result<()> {
        if self.pwm.max_duty_cycle() < self.duty.max() {
            return Err(Error::Init("PWM resolution below configured top"));
        }
        self.pwm
            .set_duty_cycle(self.duty.get())
            .map_err(|_| ActuatorError::PwmWriteFailed)?;
        self.indicator.clear()?;
        info!(
            "Instrument started: duty={}/{} auto_regulation={} indicator={}",
            self.duty.get(),
            self.config.pwm_top,
            self.flags.auto_regulation,
            self.flags.indicator_enabled
        );
        Ok(())
    }

    // ── Main-loop iteration ───────────────────────────────────

    /// Run one pass of the main loop, sleep included.
    pub fn run_iteration(
        &mut self,
        shared: &SharedState,
        hw: &mut (impl Comparator + Transport + SleepControl),
    ) {
        self.track_link(shared);

        // 1. Host I/O
        if shared.transport_up() {
            if let Some(byte) = hw.read_byte() {
                self.handle_byte(byte, hw, shared);
            }
            if self.flags.reporting {
                if let Some(snapshot) = take_snapshot(shared) {
                    self.reply(Reply::Report(snapshot), hw, shared);
                }
            }
        }

        // 2. HV regulation
        if self.flags.auto_regulation {
            let above = hw.above_threshold();
            self.regulate(above);
        }

        // 3. Tick indicator.  A request stays pending while the indicator is
        // disabled and fires on re-enable.
        if self.flags.indicator_enabled && shared.take_tick_request() {
            if let Err(e) = self.indicator.assert() {
                self.actuator_fault(e);
            }
        }

        // 4. Sleep
        let early = self.scheduler.sleep(shared, hw);
        self.diagnostics.spurious_wakeups += u64::from(early);

        // 5. Indicator off, whatever the enable flag says
        if let Err(e) = self.indicator.clear() {
            self.actuator_fault(e);
        }

        self.track_dropped(shared);
        self.diagnostics.iterations += 1;
    }

    // ── Command handling ──────────────────────────────────────

    /// Decode and execute one received byte.  Unknown bytes are ignored.
    pub fn handle_byte(
        &mut self,
        byte: u8,
        hw: &mut (impl Comparator + Transport),
        shared: &SharedState,
    ) {
        match Command::parse(byte) {
            Some(cmd) => self.handle_command(cmd, hw, shared),
            None => trace!("ignored byte 0x{:02x}", byte),
        }
    }

    /// Execute one host command, writing its reply if it has one.
    pub fn handle_command(
        &mut self,
        cmd: Command,
        hw: &mut (impl Comparator + Transport),
        shared: &SharedState,
    ) {
        let reply = match cmd {
            Command::DutyUp => {
                self.manual_duty(|d| d.raise(1));
                None
            }
            Command::DutyUpCoarse => {
                self.manual_duty(|d| d.raise(10));
                None
            }
            Command::DutyDown => {
                self.manual_duty(|d| d.lower(1));
                None
            }
            Command::DutyDownCoarse => {
                self.manual_duty(|d| d.lower(10));
                None
            }
            Command::QueryThreshold => Some(Reply::Threshold(hw.above_threshold())),
            Command::QueryDuty => Some(Reply::Duty(self.duty.get())),
            Command::Ring => {
                shared.request_tick();
                None
            }
            Command::QueryIndicator => Some(Reply::Indicator(self.flags.indicator_enabled)),
            Command::ToggleIndicator => {
                self.flags.indicator_enabled = !self.flags.indicator_enabled;
                info!("Indicator {}", on_off(self.flags.indicator_enabled));
                Some(Reply::Indicator(self.flags.indicator_enabled))
            }
            Command::QueryRegulation => Some(Reply::Regulation(self.flags.auto_regulation)),
            Command::ToggleRegulation => {
                self.flags.auto_regulation = !self.flags.auto_regulation;
                info!("Auto regulation {}", on_off(self.flags.auto_regulation));
                Some(Reply::Regulation(self.flags.auto_regulation))
            }
            Command::StartReporting => {
                if !self.flags.reporting {
                    info!("Count reports on");
                }
                self.flags.reporting = true;
                None
            }
            Command::StopReporting => {
                if self.flags.reporting {
                    info!("Count reports off");
                }
                self.flags.reporting = false;
                None
            }
        };

        if let Some(reply) = reply {
            self.reply(reply, hw, shared);
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current PWM compare value.
    pub fn duty(&self) -> u16 {
        self.duty.get()
    }

    pub fn flags(&self) -> ModeFlags {
        self.flags
    }

    /// Whether the regulator has seen the HV target at least once.
    pub fn reached(&self) -> bool {
        self.regulator.reached()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn indicator_asserted(&self) -> bool {
        self.indicator.is_asserted()
    }

    pub fn pwm(&self) -> &P {
        &self.pwm
    }

    pub fn indicator_pin(&self) -> &L {
        self.indicator.pin()
    }

    // ── Internal ──────────────────────────────────────────────

    fn manual_duty(&mut self, change: impl FnOnce(&mut DutyCycle)) {
        let before = self.duty.get();
        change(&mut self.duty);
        debug!("Manual duty {} -> {}", before, self.duty.get());
        self.write_duty();
    }

    fn regulate(&mut self, above: bool) {
        match self.regulator.step(above, &mut self.duty) {
            Adjustment::Unchanged => {}
            Adjustment::Raised { from, to } => {
                trace!("HV low, duty {} -> {}", from, to);
                self.write_duty();
            }
            Adjustment::Trimmed { from, to, first } => {
                if first {
                    info!("HV target reached at duty {}, fine stepping from now on", from);
                } else {
                    trace!("HV settle trim {} -> {}", from, to);
                }
                self.write_duty();
            }
        }
    }

    fn write_duty(&mut self) {
        if self.pwm.set_duty_cycle(self.duty.get()).is_err() {
            self.actuator_fault(ActuatorError::PwmWriteFailed);
        }
    }

    fn actuator_fault(&mut self, e: ActuatorError) {
        self.diagnostics.actuator_faults = self.diagnostics.actuator_faults.saturating_add(1);
        warn!("{}", Error::from(e));
    }

    /// Write `reply` if the link is up; failures are logged and dropped.
    fn reply(&mut self, reply: Reply, hw: &mut impl Transport, shared: &SharedState) {
        if !shared.transport_up() {
            return;
        }
        let line = reply.render();
        if let Err(e) = hw.write_line(line.as_bytes()) {
            self.diagnostics.write_failures = self.diagnostics.write_failures.saturating_add(1);
            warn!("Reply dropped: {}", Error::from(e));
        }
    }

    fn track_link(&mut self, shared: &SharedState) {
        let up = shared.transport_up();
        if up != self.link_up {
            self.link_up = up;
            info!("Host link {}", if up { "up" } else { "down" });
        }
    }

    fn track_dropped(&mut self, shared: &SharedState) {
        let dropped = shared.dropped_snapshots();
        if dropped != self.diagnostics.dropped_snapshots {
            if self.flags.reporting {
                debug!(
                    "{} window(s) overwritten before being reported",
                    dropped.wrapping_sub(self.diagnostics.dropped_snapshots)
                );
            }
            self.diagnostics.dropped_snapshots = dropped;
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}
