//! Per-instrument position state and stop rules.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

impl From<Direction> for i8 {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Long => 1,
            Direction::Short => -1,
        }
    }
}

impl TryFrom<i8> for Direction {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Direction::Long),
            -1 => Ok(Direction::Short),
            other => Err(format!("direction must be 1 or -1, got {other}")),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// An active position. Only exists while the instrument is not flat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenPosition {
    pub direction: Direction,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub stop_price: Option<f64>,
}

/// Exactly one of these exists per instrument during a run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PositionState {
    #[default]
    Flat,
    Open(OpenPosition),
}

impl PositionState {
    pub fn open_position(&self) -> Option<&OpenPosition> {
        match self {
            PositionState::Flat => None,
            PositionState::Open(pos) => Some(pos),
        }
    }
}

/// Exit rule applied on top of the close signals.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum StopRule {
    #[default]
    None,
    /// Stop placed `perc` away from the entry price, e.g. 0.1 = 10%.
    FixedPercent(f64),
}

impl StopRule {
    pub fn stop_price(&self, direction: Direction, entry_price: f64) -> Option<f64> {
        match *self {
            StopRule::None => None,
            StopRule::FixedPercent(perc) => Some(match direction {
                Direction::Long => entry_price * (1.0 - perc),
                Direction::Short => entry_price * (1.0 + perc),
            }),
        }
    }
}

/// Strict comparison: a close exactly at the stop does not trigger it.
pub fn stop_hit(position: &OpenPosition, close: f64) -> bool {
    match (position.stop_price, position.direction) {
        (None, _) => false,
        (Some(stop), Direction::Long) => close < stop,
        (Some(stop), Direction::Short) => close > stop,
    }
}
