//! Closed-loop HV regulation against a comparator that trips once the
//! duty reaches a fixed value.

use geiger::adapters::sim::{ComparatorModel, SimBoard};
use geiger::config::SystemConfig;
use geiger::shared::SharedState;

use crate::mock_hw::{instrument, instrument_with_probe, run};

const TRIP: u16 = 300;

#[test]
fn ramps_coarsely_then_holds_at_trip_point() {
    let shared = SharedState::new();
    let mut board = SimBoard::new(&shared);
    let (mut app, probe) = instrument_with_probe(SystemConfig::default());
    board.set_comparator(ComparatorModel::DutyAtLeast {
        threshold: TRIP,
        probe,
    });

    // First regulated iteration: both low-zone coarse steps.
    run(&mut app, &shared, &mut board, 1);
    assert_eq!(app.duty(), 35);

    run(&mut app, &shared, &mut board, 299);
    assert!(!app.reached());
    assert_eq!(app.duty(), TRIP);

    // The settle trim only fires once the shared counter comes round to 100.
    run(&mut app, &shared, &mut board, 100);
    assert!(app.reached());

    run(&mut app, &shared, &mut board, 2000);
    assert!((TRIP - 1..=TRIP).contains(&app.duty()), "duty = {}", app.duty());
}

#[test]
fn comparator_read_once_per_iteration_and_repowered() {
    let shared = SharedState::new();
    let mut board = SimBoard::new(&shared);
    let mut app = instrument();
    run(&mut app, &shared, &mut board, 3);
    assert!(board.comparator_enabled());
    assert_eq!(board.comparator_reads(), 3);
}

#[test]
fn manual_override_coexists_with_regulation() {
    let shared = SharedState::new();
    let mut board = SimBoard::new(&shared);
    board.connect();
    board.set_comparator(ComparatorModel::Fixed(true));
    let mut app = instrument();

    board.send(b"UUU");
    run(&mut app, &shared, &mut board, 3);
    assert_eq!(app.duty(), 40);

    // Always above target: only settle trims move the duty.
    run(&mut app, &shared, &mut board, 100);
    assert_eq!(app.duty(), 39);
    assert!(app.reached());
}
