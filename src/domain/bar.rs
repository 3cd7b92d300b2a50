//! Raw daily bar as delivered by the data port.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One time step for one instrument, before any features are attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub adjusted_close: f64,
    pub split_coefficient: f64,
}

impl Bar {
    /// Relative gap between the open and the close: (close - open) / close.
    pub fn intraday_gap(&self) -> f64 {
        (self.close - self.open) / self.close
    }

    /// Basic OHLC sanity: finite, positive open/close, high >= low.
    pub fn is_sane(&self) -> bool {
        let fields = [self.open, self.high, self.low, self.close];
        fields.iter().all(|v| v.is_finite())
            && self.open > 0.0
            && self.close > 0.0
            && self.high >= self.low
    }
}

/// Optional inclusive date bounds applied when loading bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date <= e)
    }
}
