#![allow(dead_code)]

use chrono::NaiveDate;
use meanrev::domain::bar::{Bar, DateWindow};
use meanrev::domain::error::MeanrevError;
use meanrev::domain::signal::{CloseSignal, EnrichedBar, OpenSignal};
use meanrev::ports::data_port::DataPort;
use meanrev::ports::feature_port::FeatureProvider;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(&self, symbol: &str, window: &DateWindow) -> Result<Vec<Bar>, MeanrevError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(MeanrevError::Data {
                reason: reason.clone(),
            });
        }
        match self.data.get(symbol) {
            Some(bars) => Ok(bars
                .iter()
                .filter(|b| window.contains(b.date))
                .cloned()
                .collect()),
            None => Err(MeanrevError::NoData {
                symbol: symbol.to_string(),
            }),
        }
    }

    fn list_symbols(&self) -> Result<Vec<String>, MeanrevError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

/// Replays fixed signal columns, indexed by bar position. Positions past the
/// end of a column carry no signal.
pub struct ScriptedProvider {
    pub opens: Vec<i8>,
    pub closes: Vec<i8>,
}

impl ScriptedProvider {
    pub fn new(opens: Vec<i8>, closes: Vec<i8>) -> Self {
        Self { opens, closes }
    }

    /// Opens on every bar and closes on every bar. The state machine must
    /// still alternate strictly.
    pub fn noisy(len: usize) -> Self {
        Self {
            opens: (0..len).map(|i| if i % 3 == 0 { 1 } else { -1 }).collect(),
            closes: vec![2; len],
        }
    }
}

impl FeatureProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn feature_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn enrich(&self, bars: &[Bar]) -> Vec<EnrichedBar> {
        bars.windows(2)
            .enumerate()
            .map(|(i, pair)| EnrichedBar {
                bar: pair[0].clone(),
                next_open: pair[1].open,
                open_signal: OpenSignal::try_from(self.opens.get(i).copied().unwrap_or(0))
                    .unwrap_or(OpenSignal::None),
                close_signal: CloseSignal::try_from(self.closes.get(i).copied().unwrap_or(0))
                    .unwrap_or(CloseSignal::None),
                features: Vec::new(),
            })
            .collect()
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Consecutive calendar days from 2018-01-01.
pub fn day(i: usize) -> NaiveDate {
    date(2018, 1, 1) + chrono::Duration::days(i as i64)
}

pub fn make_bar(d: NaiveDate, open: f64, close: f64) -> Bar {
    Bar {
        date: d,
        open,
        high: open.max(close) + 0.5,
        low: open.min(close) - 0.5,
        close,
        volume: 1_000_000.0,
        adjusted_close: close,
        split_coefficient: 1.0,
    }
}

/// Bars from (open, close) pairs on consecutive days.
pub fn bars_from(prices: &[(f64, f64)]) -> Vec<Bar> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &(open, close))| make_bar(day(i), open, close))
        .collect()
}

/// A deterministic wavy series with non-zero variance in both the close
/// returns and the intraday gap.
pub fn wavy_bars(len: usize, base: f64) -> Vec<Bar> {
    (0..len)
        .map(|i| {
            let t = i as f64;
            let close = base + 6.0 * (t * 0.35).sin() + 0.05 * t;
            let open = close * (1.0 + 0.004 * (t * 1.3).cos());
            make_bar(day(i), open, close)
        })
        .collect()
}

pub fn enriched(i: usize, close: f64, next_open: f64, open: i8, close_signal: i8) -> EnrichedBar {
    EnrichedBar {
        bar: make_bar(day(i), close, close),
        next_open,
        open_signal: OpenSignal::try_from(open).unwrap(),
        close_signal: CloseSignal::try_from(close_signal).unwrap(),
        features: Vec::new(),
    }
}
