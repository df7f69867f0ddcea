//! Deterministic simulated board.
//!
//! Models just enough of the real hardware to run the unmodified main loop
//! on the host:
//!
//! ```text
//!            ┌────────────── 8-bit tick counter (64 µs / tick) ─────────────┐
//!  scripted  │  overflow ──▶ on_window_close                                │
//!  edges ───▶│  compare  ──▶ on_wake_timer        (armed by SleepScheduler) │
//!            │  edge     ──▶ on_detector_edge(now)                          │
//!            └──────────────────────────────────────────────────────────────┘
//!  SimPwm ──▶ DutyProbe ──▶ ComparatorModel ──▶ above_threshold()
//!  rx queue ──▶ read_byte()            write_line() ──▶ sent lines
//! ```
//!
//! Time only moves inside [`SleepControl::wait_for_interrupt`] and
//! [`SimBoard::run_ticks`]; the loop body itself takes zero ticks.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal::pwm::{ErrorType as PwmErrorType, SetDutyCycle};

use crate::app::ports::{Comparator, SleepControl, Transport};
use crate::error::TransportError;
use crate::pulse::on_detector_edge;
use crate::scheduler::on_wake_timer;
use crate::shared::{SharedState, on_transport_connect, on_transport_disconnect};
use crate::window::on_window_close;

// ── PWM ───────────────────────────────────────────────────────

/// Read side of a [`SimPwm`], for the comparator model and tests.
#[derive(Debug, Clone, Default)]
pub struct DutyProbe(Rc<Cell<u16>>);

impl DutyProbe {
    pub fn get(&self) -> u16 {
        self.0.get()
    }
}

/// PWM output that records every compare value written.
#[derive(Debug)]
pub struct SimPwm {
    top: u16,
    duty: DutyProbe,
    writes: Vec<u16>,
}

impl SimPwm {
    pub fn new(top: u16) -> Self {
        Self {
            top,
            duty: DutyProbe::default(),
            writes: Vec::new(),
        }
    }

    pub fn probe(&self) -> DutyProbe {
        self.duty.clone()
    }

    pub fn duty(&self) -> u16 {
        self.duty.get()
    }

    pub fn writes(&self) -> &[u16] {
        &self.writes
    }
}

impl PwmErrorType for SimPwm {
    type Error = Infallible;
}

impl SetDutyCycle for SimPwm {
    fn max_duty_cycle(&self) -> u16 {
        self.top
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
        self.duty.0.set(duty);
        self.writes.push(duty);
        Ok(())
    }
}

// ── Indicator pin ─────────────────────────────────────────────

/// Output pin that counts rising edges.
#[derive(Debug, Default)]
pub struct SimPin {
    high: bool,
    rising_edges: u32,
}

impl SimPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    pub fn rising_edges(&self) -> u32 {
        self.rising_edges
    }
}

impl PinErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        if !self.high {
            self.rising_edges += 1;
        }
        self.high = true;
        Ok(())
    }
}

// ── Comparator ────────────────────────────────────────────────

/// How the simulated HV sense answers.
#[derive(Debug, Clone)]
pub enum ComparatorModel {
    /// Always the same answer.
    Fixed(bool),
    /// Above target once the PWM duty reaches the given value.
    DutyAtLeast { threshold: u16, probe: DutyProbe },
}

impl ComparatorModel {
    fn above(&self) -> bool {
        match self {
            Self::Fixed(above) => *above,
            Self::DutyAtLeast { threshold, probe } => probe.get() >= *threshold,
        }
    }
}

// ── Board ─────────────────────────────────────────────────────

pub struct SimBoard<'a> {
    shared: &'a SharedState,
    now: u8,
    elapsed: u64,
    wake_at: Option<u8>,
    edges: VecDeque<u64>,
    comparator: ComparatorModel,
    comparator_enabled: bool,
    comparator_reads: u32,
    rx: VecDeque<u8>,
    sent: Vec<String>,
    refuse_writes: bool,
}

impl<'a> SimBoard<'a> {
    pub fn new(shared: &'a SharedState) -> Self {
        Self {
            shared,
            now: 0,
            elapsed: 0,
            wake_at: None,
            edges: VecDeque::new(),
            comparator: ComparatorModel::Fixed(false),
            comparator_enabled: true,
            comparator_reads: 0,
            rx: VecDeque::new(),
            sent: Vec::new(),
            refuse_writes: false,
        }
    }

    // ── Scripting ─────────────────────────────────────────────

    pub fn set_comparator(&mut self, model: ComparatorModel) {
        self.comparator = model;
    }

    /// Schedule a detector edge `delay` ticks from now (at least 1).
    pub fn pulse_in(&mut self, delay: u64) {
        let at = self.elapsed + delay.max(1);
        let pos = self.edges.partition_point(|&t| t <= at);
        self.edges.insert(pos, at);
    }

    /// Schedule detector edges at absolute tick numbers.
    pub fn pulses_at(&mut self, ticks: impl IntoIterator<Item = u64>) {
        for t in ticks {
            if t > self.elapsed {
                self.pulse_in(t - self.elapsed);
            }
        }
    }

    pub fn pending_pulses(&self) -> usize {
        self.edges.len()
    }

    pub fn connect(&mut self) {
        on_transport_connect(self.shared);
    }

    pub fn disconnect(&mut self) {
        on_transport_disconnect(self.shared);
    }

    /// Queue bytes from the host.
    pub fn send(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    pub fn pending_rx(&self) -> usize {
        self.rx.len()
    }

    /// Make every subsequent write fail with a full buffer.
    pub fn refuse_writes(&mut self, refuse: bool) {
        self.refuse_writes = refuse;
    }

    /// Lines written so far, terminators included.
    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    /// Drain the lines written so far.
    pub fn take_sent(&mut self) -> Vec<String> {
        core::mem::take(&mut self.sent)
    }

    // ── Inspection ────────────────────────────────────────────

    /// Current 8-bit timer count.
    pub fn now(&self) -> u8 {
        self.now
    }

    /// Ticks since the board was created.
    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    pub fn comparator_enabled(&self) -> bool {
        self.comparator_enabled
    }

    pub fn comparator_reads(&self) -> u32 {
        self.comparator_reads
    }

    pub fn wake_armed(&self) -> bool {
        self.wake_at.is_some()
    }

    // ── Time ──────────────────────────────────────────────────

    /// Advance the timer `ticks` times, servicing interrupts on the way.
    pub fn run_ticks(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    /// Advance one tick.  Returns whether any interrupt fired.
    fn tick(&mut self) -> bool {
        self.elapsed += 1;
        self.now = self.now.wrapping_add(1);
        let mut fired = false;

        if self.now == 0 {
            on_window_close(self.shared);
            fired = true;
        }
        while self.edges.front().is_some_and(|&t| t <= self.elapsed) {
            self.edges.pop_front();
            on_detector_edge(self.shared, self.now);
            fired = true;
        }
        if self.wake_at == Some(self.now) {
            on_wake_timer(self.shared);
            fired = true;
        }
        fired
    }
}

impl Comparator for SimBoard<'_> {
    fn above_threshold(&mut self) -> bool {
        self.comparator_reads += 1;
        self.comparator.above()
    }
}

impl Transport for SimBoard<'_> {
    fn read_byte(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    fn write_line(&mut self, line: &[u8]) -> Result<(), TransportError> {
        if !self.shared.transport_up() {
            return Err(TransportError::Disconnected);
        }
        if self.refuse_writes {
            return Err(TransportError::BufferFull);
        }
        self.sent.push(String::from_utf8_lossy(line).into_owned());
        Ok(())
    }
}

impl SleepControl for SimBoard<'_> {
    fn arm_wake(&mut self, offset_ticks: u8) {
        self.wake_at = Some(self.now.wrapping_add(offset_ticks));
    }

    fn disarm_wake(&mut self) {
        self.wake_at = None;
    }

    fn wait_for_interrupt(&mut self) {
        while !self.tick() {}
    }

    fn set_comparator_enabled(&mut self, enabled: bool) {
        self.comparator_enabled = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_closes_window() {
        let shared = SharedState::new();
        let mut board = SimBoard::new(&shared);
        board.pulses_at([3, 10, 200]);
        board.run_ticks(255);
        assert!(!shared.snapshot_ready());
        board.run_ticks(1);
        let snap = shared.take_snapshot().unwrap();
        assert_eq!((snap.count, snap.last_event), (3, 200));
        assert_eq!(board.now(), 0);
    }

    #[test]
    fn edge_stamps_current_count() {
        let shared = SharedState::new();
        let mut board = SimBoard::new(&shared);
        board.run_ticks(300);
        board.pulse_in(5);
        board.run_ticks(5);
        assert_eq!(shared.tally().last_event, (305 % 256) as u8);
        assert!(shared.take_tick_request());
    }

    #[test]
    fn wait_returns_on_each_interrupt() {
        let shared = SharedState::new();
        let mut board = SimBoard::new(&shared);
        board.pulse_in(4);
        board.arm_wake(10);
        board.wait_for_interrupt();
        assert_eq!(board.elapsed(), 4);
        assert!(!shared.take_wake());
        board.wait_for_interrupt();
        assert_eq!(board.elapsed(), 10);
        assert!(shared.take_wake());
    }

    #[test]
    fn wake_compare_wraps_with_counter() {
        let shared = SharedState::new();
        let mut board = SimBoard::new(&shared);
        board.run_ticks(250);
        board.arm_wake(15);
        board.wait_for_interrupt(); // overflow at 256
        assert!(!shared.take_wake());
        board.wait_for_interrupt();
        assert!(shared.take_wake());
        assert_eq!(board.now(), 9);
    }

    #[test]
    fn writes_need_link() {
        let shared = SharedState::new();
        let mut board = SimBoard::new(&shared);
        assert_eq!(
            board.write_line(b"a=y\r\n"),
            Err(TransportError::Disconnected)
        );
        board.connect();
        board.write_line(b"a=y\r\n").unwrap();
        board.refuse_writes(true);
        assert_eq!(board.write_line(b"x\r\n"), Err(TransportError::BufferFull));
        assert_eq!(board.sent(), ["a=y\r\n"]);
    }

    #[test]
    fn comparator_follows_pwm() {
        let shared = SharedState::new();
        let mut board = SimBoard::new(&shared);
        let mut pwm = SimPwm::new(1024);
        board.set_comparator(ComparatorModel::DutyAtLeast {
            threshold: 300,
            probe: pwm.probe(),
        });
        pwm.set_duty_cycle(299).unwrap();
        assert!(!board.above_threshold());
        pwm.set_duty_cycle(300).unwrap();
        assert!(board.above_threshold());
        assert_eq!(board.comparator_reads(), 2);
        assert_eq!(pwm.writes(), [299, 300]);
    }

    #[test]
    fn pin_counts_rising_edges() {
        let mut pin = SimPin::new();
        pin.set_high().unwrap();
        pin.set_high().unwrap();
        pin.set_low().unwrap();
        pin.set_high().unwrap();
        assert_eq!(pin.rising_edges(), 2);
        assert!(pin.is_high());
    }
}
