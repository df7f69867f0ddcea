//! Fixed-period sampling window.
//!
//! The window timer overflows every [`WINDOW_TICKS`](crate::config::WINDOW_TICKS)
//! ticks.  Its ISR latches the open tally into the shared snapshot and
//! restarts counting from zero.  The main loop picks the snapshot up with
//! [`take_snapshot`]; a snapshot nobody consumed is simply overwritten.

use crate::shared::{SharedState, Snapshot};

/// Close the current window.  Interrupt context.
///
/// Returns `true` if the previous snapshot was still unconsumed and has
/// been dropped.
pub fn on_window_close(shared: &SharedState) -> bool {
    shared.close_window()
}

/// Close the current window and restart the window clock at `start` in
/// one step.  Interrupt or timer-task context.
pub fn on_window_close_at(shared: &SharedState, start: u32) -> bool {
    shared.close_window_at(start)
}

/// Consume the most recent closed window, if any arrived since the last
/// call.  Main-loop context.
pub fn take_snapshot(shared: &SharedState) -> Option<Snapshot> {
    shared.take_snapshot()
}
