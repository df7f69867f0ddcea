//! Periodic count report line.
//!
//! One line per consumed window while reporting is enabled:
//!
//! ```text
//! c  5, 14\r\n
//!  │    └── tick of the last event in the window (3 wide)
//!  └─────── events in the window (3 wide)
//! ```
//!
//! Fields are right-aligned and space padded to three columns, never
//! truncated.  [`ReportLine::parse`] is the host-side inverse.

use core::fmt::Write;

use crate::shared::Snapshot;

/// Longest line the firmware emits (`c65535,255\r\n` plus slack).
pub const LINE_CAP: usize = 24;

pub type Line = heapless::String<LINE_CAP>;

/// Render a snapshot as a report line, terminator included.
pub fn format_report(snapshot: &Snapshot) -> Line {
    let mut line = Line::new();
    let _ = write!(
        line,
        "c{:3},{:3}\r\n",
        snapshot.count, snapshot.last_event
    );
    line
}

/// A report line as read back by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportLine {
    pub count: u16,
    pub last_event: u8,
}

impl ReportLine {
    /// Parse `c<count>,<time>` with optional padding and line terminator.
    /// Anything else (command replies, noise) yields `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let body = line.trim_end_matches(['\r', '\n']).strip_prefix('c')?;
        let (count, time) = body.split_once(',')?;
        Some(Self {
            count: count.trim().parse().ok()?,
            last_event: time.trim().parse().ok()?,
        })
    }
}

impl From<Snapshot> for ReportLine {
    fn from(s: Snapshot) -> Self {
        Self {
            count: s.count,
            last_event: s.last_event,
        }
    }
}
