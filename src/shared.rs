//! State shared between interrupt handlers and the main loop.
//!
//! ```text
//! ┌──────────────────┐  record_pulse   ┌───────────┐
//! │ Detector edge ISR│────────────────▶│   Tally   │──┐
//! └──────────────────┘                 └───────────┘  │ close_window
//! ┌──────────────────┐                 ┌───────────┐  │ (one critical
//! │ Window timer ISR │────────────────▶│ Snapshot  │◀─┘  section)
//! └──────────────────┘                 └─────┬─────┘
//!                                 ready flag │ take_snapshot
//!                                            ▼
//!                                     ┌──────────────┐
//! Wake timer ISR ──▶ wake flag ──────▶│  Main loop   │
//! USB events     ──▶ link flag ──────▶│  (consumer)  │
//! Detector ISR   ──▶ tick flag ──────▶│              │
//!                                     └──────────────┘
//! ```
//!
//! Ownership is one writer per field.  The tally is written by the
//! detector ISR and handed over (copied and zeroed) by the window ISR; the
//! snapshot is written only by the window ISR.  Both are multi-word, so
//! every access goes through `critical_section::with`.  Single-word flags
//! are plain atomics.
//!
//! On targets whose tick counter is derived from a free-running clock, the
//! clock reading at which the open window started lives here too.  It is
//! moved in the same critical section that latches the tally, and edges
//! that derive their tick from it read it under the section that records
//! them, so a pulse can never be stamped against one window and counted in
//! another.

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use critical_section::{CriticalSection, Mutex};

/// Pulses counted in the open window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    /// Detector edges since the window opened.
    pub count: u16,
    /// Timer tick of the most recent edge, 0 when none.
    pub last_event: u8,
}

/// Latched result of a closed window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub count: u16,
    pub last_event: u8,
}

impl From<Tally> for Snapshot {
    fn from(t: Tally) -> Self {
        Self {
            count: t.count,
            last_event: t.last_event,
        }
    }
}

/// Everything the interrupt handlers and the main loop both touch.
///
/// `const`-constructible so the firmware can keep one instance in a
/// `static` ([`SHARED`]) that ISR trampolines can reach; tests build their
/// own instances.
pub struct SharedState {
    tally: Mutex<Cell<Tally>>,
    snapshot: Mutex<Cell<Snapshot>>,
    window_start: Mutex<Cell<u32>>,
    snapshot_ready: AtomicBool,
    dropped_snapshots: AtomicU32,
    tick_pending: AtomicBool,
    wake: AtomicBool,
    transport_up: AtomicBool,
}

/// The instance wired to the real interrupt vectors.
pub static SHARED: SharedState = SharedState::new();

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    pub const fn new() -> Self {
        Self {
            tally: Mutex::new(Cell::new(Tally {
                count: 0,
                last_event: 0,
            })),
            snapshot: Mutex::new(Cell::new(Snapshot {
                count: 0,
                last_event: 0,
            })),
            window_start: Mutex::new(Cell::new(0)),
            snapshot_ready: AtomicBool::new(false),
            dropped_snapshots: AtomicU32::new(0),
            tick_pending: AtomicBool::new(false),
            wake: AtomicBool::new(false),
            transport_up: AtomicBool::new(false),
        }
    }

    // ── Detector ISR ──────────────────────────────────────────

    /// Count one edge seen at timer tick `now`.
    pub fn record_pulse(&self, now: u8) {
        critical_section::with(|cs| self.bump_tally(cs, now));
    }

    /// Count one edge whose tick is computed by `tick_of` from the clock
    /// reading at which the open window started.
    pub fn record_pulse_timed(&self, tick_of: impl FnOnce(u32) -> u8) {
        critical_section::with(|cs| {
            let now = tick_of(self.window_start.borrow(cs).get());
            self.bump_tally(cs, now);
        });
    }

    fn bump_tally(&self, cs: CriticalSection<'_>, now: u8) {
        let cell = self.tally.borrow(cs);
        let mut t = cell.get();
        t.count = t.count.wrapping_add(1);
        t.last_event = now;
        cell.set(t);
    }

    /// Current open-window tally.
    pub fn tally(&self) -> Tally {
        critical_section::with(|cs| self.tally.borrow(cs).get())
    }

    // ── Window ISR ────────────────────────────────────────────

    /// Latch the tally into the snapshot, zero the tally, then raise the
    /// ready flag.  Returns `true` when an unconsumed snapshot was
    /// overwritten.
    pub fn close_window(&self) -> bool {
        critical_section::with(|cs| self.latch_tally(cs))
    }

    /// [`close_window`](Self::close_window), also moving the window start to
    /// the clock reading `start` in the same critical section.
    pub fn close_window_at(&self, start: u32) -> bool {
        critical_section::with(|cs| {
            self.window_start.borrow(cs).set(start);
            self.latch_tally(cs)
        })
    }

    /// Set the clock reading of the first window without publishing one.
    pub fn start_window_clock(&self, start: u32) {
        critical_section::with(|cs| self.window_start.borrow(cs).set(start));
    }

    fn latch_tally(&self, cs: CriticalSection<'_>) -> bool {
        let tally = self.tally.borrow(cs).replace(Tally::default());
        self.snapshot.borrow(cs).set(tally.into());
        let dropped = self.snapshot_ready.swap(true, Ordering::Release);
        if dropped {
            self.dropped_snapshots.fetch_add(1, Ordering::Relaxed);
        }
        dropped
    }

    // ── Main loop ─────────────────────────────────────────────

    /// Whether a snapshot is waiting to be consumed.
    pub fn snapshot_ready(&self) -> bool {
        self.snapshot_ready.load(Ordering::Acquire)
    }

    /// Consume the latest snapshot, if one was published since the last
    /// call.  Flag and payload are read under the same critical section so
    /// a window closing in between can neither tear nor duplicate it.
    pub fn take_snapshot(&self) -> Option<Snapshot> {
        critical_section::with(|cs| {
            if self.snapshot_ready.swap(false, Ordering::Acquire) {
                Some(self.snapshot.borrow(cs).get())
            } else {
                None
            }
        })
    }

    /// Snapshots overwritten before the main loop consumed them.
    pub fn dropped_snapshots(&self) -> u32 {
        self.dropped_snapshots.load(Ordering::Relaxed)
    }

    // ── Tick request ──────────────────────────────────────────

    pub fn request_tick(&self) {
        self.tick_pending.store(true, Ordering::Release);
    }

    pub fn take_tick_request(&self) -> bool {
        self.tick_pending.swap(false, Ordering::Acquire)
    }

    // ── Wake flag ─────────────────────────────────────────────

    pub fn signal_wake(&self) {
        self.wake.store(true, Ordering::Release);
    }

    pub fn clear_wake(&self) {
        self.wake.store(false, Ordering::Release);
    }

    pub fn take_wake(&self) -> bool {
        self.wake.swap(false, Ordering::Acquire)
    }

    // ── Transport link ────────────────────────────────────────

    pub fn set_transport_up(&self, up: bool) {
        self.transport_up.store(up, Ordering::Release);
    }

    pub fn transport_up(&self) -> bool {
        self.transport_up.load(Ordering::Acquire)
    }
}

/// USB connect notification.  Called from the transport stack's event hook.
pub fn on_transport_connect(shared: &SharedState) {
    shared.set_transport_up(true);
}

/// USB disconnect notification.
pub fn on_transport_disconnect(shared: &SharedState) {
    shared.set_transport_up(false);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_quiet() {
        let s = SharedState::new();
        assert_eq!(s.tally(), Tally::default());
        assert!(!s.snapshot_ready());
        assert_eq!(s.take_snapshot(), None);
        assert!(!s.take_tick_request());
        assert!(!s.transport_up());
    }

    #[test]
    fn close_publishes_and_resets() {
        let s = SharedState::new();
        s.record_pulse(3);
        s.record_pulse(7);
        assert!(!s.close_window());

        assert_eq!(s.tally(), Tally::default());
        assert!(s.snapshot_ready());
        assert_eq!(
            s.take_snapshot(),
            Some(Snapshot {
                count: 2,
                last_event: 7
            })
        );
        assert!(!s.snapshot_ready());
        assert_eq!(s.take_snapshot(), None);
    }

    #[test]
    fn unconsumed_snapshot_is_overwritten() {
        let s = SharedState::new();
        s.record_pulse(1);
        s.close_window();
        s.record_pulse(9);
        s.record_pulse(10);
        s.record_pulse(11);
        assert!(s.close_window());

        assert_eq!(s.dropped_snapshots(), 1);
        assert_eq!(
            s.take_snapshot(),
            Some(Snapshot {
                count: 3,
                last_event: 11
            })
        );
    }

    #[test]
    fn empty_window_publishes_zeroes() {
        let s = SharedState::new();
        s.close_window();
        assert_eq!(s.take_snapshot(), Some(Snapshot::default()));
    }

    #[test]
    fn timed_pulse_reads_start_of_open_window() {
        let s = SharedState::new();
        s.start_window_clock(1_000);
        s.record_pulse_timed(|start| {
            assert_eq!(start, 1_000);
            4
        });
        assert!(!s.close_window_at(5_000));
        s.record_pulse_timed(|start| {
            assert_eq!(start, 5_000);
            1
        });

        assert_eq!(
            s.take_snapshot(),
            Some(Snapshot {
                count: 1,
                last_event: 4
            })
        );
        assert_eq!(s.tally().last_event, 1);
    }

    #[test]
    fn wake_flag_is_one_shot() {
        let s = SharedState::new();
        s.signal_wake();
        assert!(s.take_wake());
        assert!(!s.take_wake());

        s.signal_wake();
        s.clear_wake();
        assert!(!s.take_wake());
    }

    #[test]
    fn connect_and_disconnect_flip_link() {
        let s = SharedState::new();
        on_transport_connect(&s);
        assert!(s.transport_up());
        on_transport_disconnect(&s);
        assert!(!s.transport_up());
    }
}
