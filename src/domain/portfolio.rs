//! Symbol-keyed collections of bar sequences.

use std::collections::{BTreeMap, HashMap};

use super::bar::Bar;
use super::signal::EnrichedBar;

/// Fewest raw bars an instrument needs: two log returns for a sample
/// variance, and one bar left after the provider drops the last row.
pub const MIN_BARS: usize = 3;

/// Raw bars per symbol. Iteration order is the symbol order, so every run
/// over the same portfolio visits instruments identically.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Portfolio {
    instruments: BTreeMap<String, Vec<Bar>>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: impl Into<String>, bars: Vec<Bar>) {
        self.instruments.insert(symbol.into(), bars);
    }

    pub fn get(&self, symbol: &str) -> Option<&[Bar]> {
        self.instruments.get(symbol).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.instruments.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Bar])> {
        self.instruments
            .iter()
            .map(|(symbol, bars)| (symbol.as_str(), bars.as_slice()))
    }

    /// Most common sequence length, ties going to the longer one.
    pub fn modal_length(&self) -> Option<usize> {
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for bars in self.instruments.values() {
            *counts.entry(bars.len()).or_default() += 1;
        }
        counts
            .into_iter()
            .max_by_key(|&(len, count)| (count, len))
            .map(|(len, _)| len)
    }

    /// Drop every instrument whose length differs from the modal length.
    /// Returns the dropped symbols in symbol order.
    pub fn cleanse(&mut self) -> Vec<String> {
        let Some(expected) = self.modal_length() else {
            return Vec::new();
        };
        let dropped: Vec<String> = self
            .instruments
            .iter()
            .filter(|(_, bars)| bars.len() != expected)
            .map(|(symbol, _)| symbol.clone())
            .collect();
        self.instruments.retain(|_, bars| bars.len() == expected);
        dropped
    }
}

impl FromIterator<(String, Vec<Bar>)> for Portfolio {
    fn from_iter<I: IntoIterator<Item = (String, Vec<Bar>)>>(iter: I) -> Self {
        Portfolio {
            instruments: iter.into_iter().collect(),
        }
    }
}

/// Enriched bars per symbol, ready for the backtest runner.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnrichedPortfolio {
    instruments: BTreeMap<String, Vec<EnrichedBar>>,
}

impl EnrichedPortfolio {
    pub fn insert(&mut self, symbol: impl Into<String>, bars: Vec<EnrichedBar>) {
        self.instruments.insert(symbol.into(), bars);
    }

    pub fn get(&self, symbol: &str) -> Option<&[EnrichedBar]> {
        self.instruments.get(symbol).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[EnrichedBar])> {
        self.instruments
            .iter()
            .map(|(symbol, bars)| (symbol.as_str(), bars.as_slice()))
    }
}

impl FromIterator<(String, Vec<EnrichedBar>)> for EnrichedPortfolio {
    fn from_iter<I: IntoIterator<Item = (String, Vec<EnrichedBar>)>>(iter: I) -> Self {
        EnrichedPortfolio {
            instruments: iter.into_iter().collect(),
        }
    }
}
