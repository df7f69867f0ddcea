//! Detector pulse counter.
//!
//! The tube's threshold comparator drives a GPIO low on every ionisation
//! event.  The edge ISR calls [`on_detector_edge`] with the current
//! window-relative timer tick; there is no software debounce, the analog
//! front end already shapes the pulse.

use crate::shared::SharedState;

/// Handle one detector edge: count it, timestamp it, request a tick.
///
/// Interrupt context.  Must not log or block.
pub fn on_detector_edge(shared: &SharedState, now: u8) {
    shared.record_pulse(now);
    shared.request_tick();
}

/// [`on_detector_edge`] for timers that derive the tick from a
/// free-running clock: `tick_of` maps the open window's start reading to
/// the current tick and runs inside the section that records the edge.
pub fn on_detector_edge_timed(shared: &SharedState, tick_of: impl FnOnce(u32) -> u8) {
    shared.record_pulse_timed(tick_of);
    shared.request_tick();
}
