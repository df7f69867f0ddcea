//! Shared helpers: an [`Instrument`] wired to simulated outputs.

use geiger::adapters::sim::{DutyProbe, SimBoard, SimPin, SimPwm};
use geiger::app::service::Instrument;
use geiger::config::{PWM_TOP, SystemConfig};
use geiger::shared::SharedState;

pub type SimInstrument = Instrument<SimPwm, SimPin>;

pub fn instrument_with(config: SystemConfig) -> SimInstrument {
    let pwm = SimPwm::new(config.pwm_top);
    let mut app = Instrument::new(config, pwm, SimPin::new()).expect("valid config");
    app.start().expect("sim outputs never fail");
    app
}

pub fn instrument() -> SimInstrument {
    instrument_with(SystemConfig::default())
}

/// Default config with automatic regulation off, so duty only moves on
/// host command.
pub fn manual_instrument() -> SimInstrument {
    instrument_with(SystemConfig {
        auto_regulation: false,
        ..SystemConfig::default()
    })
}

/// Instrument whose comparator model follows its own PWM output.
pub fn instrument_with_probe(config: SystemConfig) -> (SimInstrument, DutyProbe) {
    let pwm = SimPwm::new(config.pwm_top);
    let probe = pwm.probe();
    let mut app = Instrument::new(config, pwm, SimPin::new()).expect("valid config");
    app.start().expect("sim outputs never fail");
    (app, probe)
}

pub fn run(
    app: &mut SimInstrument,
    shared: &SharedState,
    board: &mut SimBoard<'_>,
    iterations: usize,
) {
    for _ in 0..iterations {
        app.run_iteration(shared, board);
    }
}

pub const TOP: u16 = PWM_TOP;
