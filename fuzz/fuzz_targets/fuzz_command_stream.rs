//! Fuzz target: host command stream
//!
//! Feeds arbitrary bytes through the full main loop on the simulated board,
//! one byte per iteration, and verifies:
//! - No panics under arbitrary input
//! - Duty never leaves `1..PWM_TOP`
//! - Every line written is `\r\n` terminated and one of the known replies
//! - The indicator is never left asserted between iterations
//!
//! cargo fuzz run fuzz_command_stream

#![no_main]

use geiger::adapters::sim::{ComparatorModel, SimBoard, SimPin, SimPwm};
use geiger::app::service::Instrument;
use geiger::config::{PWM_TOP, SystemConfig};
use geiger::report::ReportLine;
use geiger::shared::SharedState;
use libfuzzer_sys::fuzz_target;

fn known_reply(line: &str) -> bool {
    matches!(
        line,
        "a=y" | "a=n" | "Buzzer on" | "Buzzer off" | "Comparator on" | "Comparator off"
    ) || line.strip_prefix("d=").is_some_and(|d| d.parse::<u16>().is_ok())
        || ReportLine::parse(line).is_some()
}

fuzz_target!(|data: &[u8]| {
    let shared = SharedState::new();
    let mut board = SimBoard::new(&shared);
    board.connect();
    let mut app = Instrument::new(SystemConfig::default(), SimPwm::new(PWM_TOP), SimPin::new())
        .expect("default config is valid");
    app.start().expect("sim outputs never fail");

    for (i, &byte) in data.iter().enumerate() {
        // Low bit of every 8th byte drives the comparator; bit 1 schedules a pulse.
        if i % 8 == 0 {
            board.set_comparator(ComparatorModel::Fixed(byte & 1 == 1));
        }
        if byte & 2 == 2 {
            board.pulse_in(u64::from(byte >> 2) + 1);
        }
        board.send(&[byte]);
        app.run_iteration(&shared, &mut board);

        assert!((1..PWM_TOP).contains(&app.duty()), "duty {} out of range", app.duty());
        assert!(!app.indicator_pin().is_high(), "indicator left asserted");
    }

    for line in board.sent() {
        let body = line.strip_suffix("\r\n").expect("unterminated line");
        assert!(known_reply(body), "unexpected line {line:?}");
    }
});
