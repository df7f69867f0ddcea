//! Geiger Counter Firmware: Main Entry Point
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  EspBoard (Comparator + Transport + SleepControl)            │
//! │  LedcPwm (SetDutyCycle)        GpioOutput (OutputPin)        │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ────────────────        │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │            Instrument (pure logic)                 │      │
//! │  │  commands · regulator · sleep scheduler            │      │
//! │  └────────────────────────────────────────────────────┘      │
//! │                                                              │
//! │  ISRs: detector edge · window timer · wake timer  ──▶ SHARED │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use anyhow::Result;
use log::info;

use geiger::adapters::hardware::{EspBoard, GpioOutput, LedcPwm};
use geiger::app::service::Instrument;
use geiger::config::SystemConfig;
use geiger::drivers::{hw_init, hw_timer};
use geiger::pins;
use geiger::shared::SHARED;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("Geiger counter v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Peripherals ────────────────────────────────────────
    let config = SystemConfig::default();
    hw_init::init_peripherals()?;

    let pwm = LedcPwm::new(pins::LEDC_CH_HV, pins::HV_PWM_RESOLUTION_BITS);
    let indicator = GpioOutput::new(pins::INDICATOR_GPIO);
    let mut instrument = Instrument::new(config, pwm, indicator)?;
    instrument.start()?;

    // Counting starts only once the outputs are in their power-on state.
    hw_timer::start_timers(instrument.config())?;
    hw_init::init_isr_service()?;

    // ── 3. Main loop ──────────────────────────────────────────
    let mut board = EspBoard::new(&SHARED);
    info!("System ready. Entering main loop.");
    loop {
        board.poll_link();
        instrument.run_iteration(&SHARED, &mut board);
    }
}
