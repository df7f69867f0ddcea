//! Host command channel through the full main loop.

use geiger::adapters::sim::{ComparatorModel, SimBoard};
use geiger::shared::SharedState;

use crate::mock_hw::{TOP, instrument, manual_instrument, run};

#[test]
fn coarse_and_fine_manual_steps() {
    let shared = SharedState::new();
    let mut board = SimBoard::new(&shared);
    board.connect();
    let mut app = manual_instrument();

    board.send(b"UUUdd");
    run(&mut app, &shared, &mut board, 5);
    assert_eq!(app.duty(), 38);
    assert_eq!(app.pwm().writes(), [10, 20, 30, 40, 39, 38]);

    board.send(b"m");
    run(&mut app, &shared, &mut board, 1);
    assert_eq!(board.sent(), ["d=38\r\n"]);
}

#[test]
fn one_byte_per_iteration() {
    let shared = SharedState::new();
    let mut board = SimBoard::new(&shared);
    board.connect();
    let mut app = manual_instrument();

    board.send(b"uuuu");
    run(&mut app, &shared, &mut board, 2);
    assert_eq!(app.duty(), 12);
    assert_eq!(board.pending_rx(), 2);
}

#[test]
fn duty_saturates_at_both_ends() {
    let shared = SharedState::new();
    let mut board = SimBoard::new(&shared);
    board.connect();
    let mut app = manual_instrument();

    board.send(&[b'U'; 120]);
    run(&mut app, &shared, &mut board, 120);
    assert_eq!(app.duty(), TOP - 1);

    board.send(&[b'D'; 120]);
    run(&mut app, &shared, &mut board, 120);
    assert_eq!(app.duty(), 1);
}

#[test]
fn indicator_query_and_toggle() {
    let shared = SharedState::new();
    let mut board = SimBoard::new(&shared);
    board.connect();
    let mut app = instrument();

    board.send(b"bBbB");
    run(&mut app, &shared, &mut board, 4);
    assert_eq!(
        board.sent(),
        ["Buzzer on\r\n", "Buzzer off\r\n", "Buzzer off\r\n", "Buzzer on\r\n"]
    );
    assert!(app.flags().indicator_enabled);
}

#[test]
fn regulation_query_and_toggle() {
    let shared = SharedState::new();
    let mut board = SimBoard::new(&shared);
    board.connect();
    let mut app = instrument();

    board.send(b"cCc");
    run(&mut app, &shared, &mut board, 3);
    assert_eq!(
        board.sent(),
        ["Comparator on\r\n", "Comparator off\r\n", "Comparator off\r\n"]
    );
    assert!(!app.flags().auto_regulation);
}

#[test]
fn threshold_query_reports_comparator() {
    let shared = SharedState::new();
    let mut board = SimBoard::new(&shared);
    board.connect();
    let mut app = manual_instrument();

    board.send(b"a");
    run(&mut app, &shared, &mut board, 1);
    board.set_comparator(ComparatorModel::Fixed(true));
    board.send(b"a");
    run(&mut app, &shared, &mut board, 1);
    assert_eq!(board.sent(), ["a=n\r\n", "a=y\r\n"]);
}

#[test]
fn unknown_bytes_are_silent() {
    let shared = SharedState::new();
    let mut board = SimBoard::new(&shared);
    board.connect();
    let mut app = manual_instrument();
    let flags = app.flags();

    board.send(b"xq!\r\n\0");
    run(&mut app, &shared, &mut board, 6);
    assert!(board.sent().is_empty());
    assert_eq!(app.flags(), flags);
    assert_eq!(app.duty(), 10);
    assert_eq!(app.pwm().writes(), [10]);
}

#[test]
fn disabled_regulation_leaves_duty_alone() {
    let shared = SharedState::new();
    let mut board = SimBoard::new(&shared);
    board.connect();
    let mut app = instrument();

    board.send(b"C");
    run(&mut app, &shared, &mut board, 200);
    assert_eq!(app.duty(), 10);
    assert_eq!(app.pwm().writes(), [10]);
    assert_eq!(board.comparator_reads(), 0);
}

#[test]
fn manual_steps_survive_regulation_off() {
    let shared = SharedState::new();
    let mut board = SimBoard::new(&shared);
    board.set_comparator(ComparatorModel::Fixed(false));
    board.connect();
    let mut app = instrument();

    board.send(b"CUUU");
    run(&mut app, &shared, &mut board, 200);
    assert!(!app.flags().auto_regulation);
    assert_eq!(app.duty(), 40);
    assert_eq!(app.pwm().writes(), [10, 20, 30, 40]);
}

#[test]
fn ring_respects_indicator_enable() {
    let shared = SharedState::new();
    let mut board = SimBoard::new(&shared);
    board.connect();
    let mut app = manual_instrument();

    board.send(b"z");
    run(&mut app, &shared, &mut board, 1);
    assert_eq!(app.indicator_pin().rising_edges(), 1);

    // Disable, then ring: nothing sounds, the request waits.
    board.send(b"Bz");
    run(&mut app, &shared, &mut board, 3);
    assert_eq!(app.indicator_pin().rising_edges(), 1);

    // Re-enabling fires the pending request exactly once.
    board.send(b"B");
    run(&mut app, &shared, &mut board, 3);
    assert_eq!(app.indicator_pin().rising_edges(), 2);
    assert!(!app.indicator_pin().is_high());
}

#[test]
fn failed_writes_do_not_stall_the_loop() {
    let shared = SharedState::new();
    let mut board = SimBoard::new(&shared);
    board.connect();
    board.refuse_writes(true);
    let mut app = manual_instrument();

    board.send(b"mmmU");
    run(&mut app, &shared, &mut board, 4);
    assert_eq!(app.diagnostics().write_failures, 3);
    assert_eq!(app.duty(), 20);
    assert_eq!(app.diagnostics().iterations, 4);
}
