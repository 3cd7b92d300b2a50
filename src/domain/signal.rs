//! Signal values and the enriched bar produced by a feature provider.
//!
//! The numeric contract is `open_signal ∈ {-1, 0, 1}` and
//! `close_signal ∈ {-1, 0, 1, 2}`. Inside the crate both are enums; the
//! `TryFrom<i8>` / `as_i8` pair converts at the boundary.

use crate::domain::bar::Bar;
use crate::domain::position::Direction;
use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("signal value {value} out of range for {kind}")]
pub struct SignalRangeError {
    pub kind: &'static str,
    pub value: i8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenSignal {
    Short,
    #[default]
    None,
    Long,
}

impl OpenSignal {
    pub fn as_i8(self) -> i8 {
        match self {
            OpenSignal::Short => -1,
            OpenSignal::None => 0,
            OpenSignal::Long => 1,
        }
    }

    pub fn direction(self) -> Option<Direction> {
        match self {
            OpenSignal::Short => Some(Direction::Short),
            OpenSignal::None => None,
            OpenSignal::Long => Some(Direction::Long),
        }
    }
}

impl TryFrom<i8> for OpenSignal {
    type Error = SignalRangeError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(OpenSignal::Short),
            0 => Ok(OpenSignal::None),
            1 => Ok(OpenSignal::Long),
            _ => Err(SignalRangeError {
                kind: "open_signal",
                value,
            }),
        }
    }
}

/// `2` closes whatever is open; `±1` only closes a position in that direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloseSignal {
    CloseShort,
    #[default]
    None,
    CloseLong,
    CloseAny,
}

impl CloseSignal {
    pub fn as_i8(self) -> i8 {
        match self {
            CloseSignal::CloseShort => -1,
            CloseSignal::None => 0,
            CloseSignal::CloseLong => 1,
            CloseSignal::CloseAny => 2,
        }
    }

    pub fn closes(self, direction: Direction) -> bool {
        matches!(
            (self, direction),
            (CloseSignal::CloseAny, _)
                | (CloseSignal::CloseLong, Direction::Long)
                | (CloseSignal::CloseShort, Direction::Short)
        )
    }
}

impl TryFrom<i8> for CloseSignal {
    type Error = SignalRangeError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(CloseSignal::CloseShort),
            0 => Ok(CloseSignal::None),
            1 => Ok(CloseSignal::CloseLong),
            2 => Ok(CloseSignal::CloseAny),
            _ => Err(SignalRangeError {
                kind: "close_signal",
                value,
            }),
        }
    }
}

impl fmt::Display for OpenSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i8())
    }
}

impl fmt::Display for CloseSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i8())
    }
}

/// A raw bar plus the execution price of the following bar, the two signal
/// fields and whatever feature columns the provider computed.
///
/// `features` is aligned with the provider's `feature_names()` and is passed
/// through untouched by the state machine and ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedBar {
    pub bar: Bar,
    pub next_open: f64,
    pub open_signal: OpenSignal,
    pub close_signal: CloseSignal,
    pub features: Vec<f64>,
}

impl EnrichedBar {
    pub fn date(&self) -> NaiveDate {
        self.bar.date
    }

    pub fn close(&self) -> f64 {
        self.bar.close
    }
}
