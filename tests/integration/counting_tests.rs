//! Pulse counting, window latching and periodic reports.
//!
//! Every main-loop iteration sleeps exactly one wake period (15 ticks), so
//! iteration `k` starts at tick `15 * k`.  Windows close on every 256-tick
//! counter overflow; the first report is therefore written by iteration 18
//! (tick 270) and the second by iteration 35 (tick 525).

use geiger::adapters::sim::SimBoard;
use geiger::report::ReportLine;
use geiger::shared::SharedState;

use crate::mock_hw::{manual_instrument, run};

#[test]
fn reports_each_window_once() {
    let shared = SharedState::new();
    let mut board = SimBoard::new(&shared);
    board.connect();
    board.pulses_at([20, 50, 100, 200]);
    let mut app = manual_instrument();

    board.send(b"s");
    run(&mut app, &shared, &mut board, 18);
    assert!(board.sent().is_empty());

    run(&mut app, &shared, &mut board, 1);
    assert_eq!(board.sent(), ["c  4,200\r\n"]);

    run(&mut app, &shared, &mut board, 17);
    assert_eq!(board.sent(), ["c  4,200\r\n", "c  0,  0\r\n"]);
}

#[test]
fn same_tick_pulses_share_a_timestamp() {
    let shared = SharedState::new();
    let mut board = SimBoard::new(&shared);
    board.connect();
    board.pulses_at([2, 5, 9, 9, 14]);
    let mut app = manual_instrument();

    board.send(b"s");
    run(&mut app, &shared, &mut board, 19);
    let sent = board.take_sent();
    assert_eq!(sent, ["c  5, 14\r\n"]);
    assert_eq!(
        ReportLine::parse(&sent[0]),
        Some(ReportLine {
            count: 5,
            last_event: 14
        })
    );
}

#[test]
fn stop_reporting_silences_output() {
    let shared = SharedState::new();
    let mut board = SimBoard::new(&shared);
    board.connect();
    let mut app = manual_instrument();

    board.send(b"sS");
    run(&mut app, &shared, &mut board, 60);
    assert!(board.sent().is_empty());
    assert!(!app.flags().reporting);
}

#[test]
fn pulses_flash_the_indicator() {
    let shared = SharedState::new();
    let mut board = SimBoard::new(&shared);
    board.pulses_at([20, 50, 100, 200]);
    let mut app = manual_instrument();

    run(&mut app, &shared, &mut board, 20);
    assert_eq!(app.indicator_pin().rising_edges(), 4);
    assert!(!app.indicator_pin().is_high());
    // Every edge woke the sleeper early; so did the window overflow.
    assert_eq!(app.diagnostics().spurious_wakeups, 5);
}

#[test]
fn link_down_suspends_io_but_not_counting() {
    let shared = SharedState::new();
    let mut board = SimBoard::new(&shared);
    board.pulses_at([30, 300, 310]);
    let mut app = manual_instrument();

    board.send(b"s");
    run(&mut app, &shared, &mut board, 40);
    assert_eq!(board.pending_rx(), 1);
    assert!(board.sent().is_empty());
    assert!(!app.flags().reporting);
    // Windows closed at 256 and 512; the second overwrote the first.
    assert_eq!(app.diagnostics().dropped_snapshots, 1);
    assert_eq!(app.indicator_pin().rising_edges(), 3);

    // The window closed at 512 (pulses at 300 and 310) is still latched.
    board.connect();
    run(&mut app, &shared, &mut board, 1);
    assert_eq!(board.sent(), ["c  2, 54\r\n"]);
}

#[test]
fn disconnect_mid_session() {
    let shared = SharedState::new();
    let mut board = SimBoard::new(&shared);
    board.connect();
    let mut app = manual_instrument();

    board.send(b"s");
    run(&mut app, &shared, &mut board, 19);
    assert_eq!(board.take_sent().len(), 1);

    board.disconnect();
    board.send(b"m");
    run(&mut app, &shared, &mut board, 40);
    assert!(board.sent().is_empty());
    assert_eq!(board.pending_rx(), 1);
    assert!(app.flags().reporting);
}
