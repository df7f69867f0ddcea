//! Inbound commands from the host.
//!
//! Every command is a single ASCII byte.  [`Command::parse`] maps a byte to
//! the action the [`Instrument`](super::service::Instrument) performs;
//! bytes outside the table yield `None` and are dropped without a reply.

/// Commands the host can send over the serial link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `u`: duty + 1.
    DutyUp,
    /// `U`: duty + 10.
    DutyUpCoarse,
    /// `d`: duty - 1.
    DutyDown,
    /// `D`: duty - 10.
    DutyDownCoarse,
    /// `a`: report whether the supply is above the target.
    QueryThreshold,
    /// `m`: report the PWM duty.
    QueryDuty,
    /// `z`: sound one tick.
    Ring,
    /// `b`: report whether the tick indicator is enabled.
    QueryIndicator,
    /// `B`: toggle the tick indicator and report the new state.
    ToggleIndicator,
    /// `c`: report whether automatic regulation is enabled.
    QueryRegulation,
    /// `C`: toggle automatic regulation and report the new state.
    ToggleRegulation,
    /// `s`: start periodic count reports.
    StartReporting,
    /// `S`: stop periodic count reports.
    StopReporting,
}

impl Command {
    pub fn parse(byte: u8) -> Option<Self> {
        match byte {
            b'u' => Some(Self::DutyUp),
            b'U' => Some(Self::DutyUpCoarse),
            b'd' => Some(Self::DutyDown),
            b'D' => Some(Self::DutyDownCoarse),
            b'a' => Some(Self::QueryThreshold),
            b'm' => Some(Self::QueryDuty),
            b'z' => Some(Self::Ring),
            b'b' => Some(Self::QueryIndicator),
            b'B' => Some(Self::ToggleIndicator),
            b'c' => Some(Self::QueryRegulation),
            b'C' => Some(Self::ToggleRegulation),
            b's' => Some(Self::StartReporting),
            b'S' => Some(Self::StopReporting),
            _ => None,
        }
    }

    /// The byte that encodes this command.
    pub fn byte(self) -> u8 {
        match self {
            Self::DutyUp => b'u',
            Self::DutyUpCoarse => b'U',
            Self::DutyDown => b'd',
            Self::DutyDownCoarse => b'D',
            Self::QueryThreshold => b'a',
            Self::QueryDuty => b'm',
            Self::Ring => b'z',
            Self::QueryIndicator => b'b',
            Self::ToggleIndicator => b'B',
            Self::QueryRegulation => b'c',
            Self::ToggleRegulation => b'C',
            Self::StartReporting => b's',
            Self::StopReporting => b'S',
        }
    }
}
