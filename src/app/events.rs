//! Outbound lines to the host.
//!
//! The [`Instrument`](super::service::Instrument) produces a [`Reply`] for
//! every query or toggle command and for each reported window.  Rendering
//! happens into a fixed-capacity buffer; nothing here allocates.

use core::fmt::Write;

use crate::report::{Line, format_report};
use crate::shared::Snapshot;

/// Everything the firmware ever writes to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// `a=y` / `a=n`
    Threshold(bool),
    /// `d=<duty>`
    Duty(u16),
    /// `Buzzer on` / `Buzzer off`
    Indicator(bool),
    /// `Comparator on` / `Comparator off`
    Regulation(bool),
    /// Unsolicited window report.
    Report(Snapshot),
}

impl Reply {
    /// Render to a `\r\n`-terminated line.
    pub fn render(&self) -> Line {
        let mut line = Line::new();
        let _ = match self {
            Self::Threshold(above) => {
                write!(line, "a={}\r\n", if *above { 'y' } else { 'n' })
            }
            Self::Duty(duty) => write!(line, "d={}\r\n", duty),
            Self::Indicator(on) => write!(line, "Buzzer {}\r\n", on_off(*on)),
            Self::Regulation(on) => write!(line, "Comparator {}\r\n", on_off(*on)),
            Self::Report(snapshot) => return format_report(snapshot),
        };
        line
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}
