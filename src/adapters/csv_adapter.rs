//! CSV file data adapter.
//!
//! One file per symbol, `<directory>/<SYMBOL>.csv`, in the daily-adjusted
//! export layout:
//!
//! ```text
//! timestamp,open,high,low,close,adjusted_close,volume,dividend_amount,split_coefficient
//! ```
//!
//! `date` is accepted in place of `timestamp`. Rows may be in any order;
//! they come back oldest first.

use crate::domain::bar::{Bar, DateWindow};
use crate::domain::error::MeanrevError;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "date")]
    timestamp: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
    #[serde(default)]
    adjusted_close: Option<f64>,
    #[serde(default)]
    split_coefficient: Option<f64>,
}

/// Which optional columns the file actually has.
#[derive(Debug, Clone, Copy)]
struct Layout {
    has_adjusted_close: bool,
    has_split_coefficient: bool,
}

impl CsvRow {
    /// `None` when a required field is missing, the date is unparsable or
    /// the prices fail `Bar::is_sane`. Optional columns only fall back to
    /// defaults when absent from the file.
    fn into_bar(self, layout: Layout) -> Option<Bar> {
        let date = NaiveDate::parse_from_str(self.timestamp.trim(), "%Y-%m-%d").ok()?;
        let close = self.close?;
        let adjusted_close = match (layout.has_adjusted_close, self.adjusted_close) {
            (false, _) => close,
            (true, value) => value?,
        };
        let split_coefficient = match (layout.has_split_coefficient, self.split_coefficient) {
            (false, _) => 1.0,
            (true, value) => value?,
        };
        let bar = Bar {
            date,
            open: self.open?,
            high: self.high?,
            low: self.low?,
            close,
            volume: self.volume?,
            adjusted_close,
            split_coefficient,
        };
        bar.is_sane().then_some(bar)
    }
}

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(&self, symbol: &str, window: &DateWindow) -> Result<Vec<Bar>, MeanrevError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => MeanrevError::NoData {
                symbol: symbol.to_string(),
            },
            _ => MeanrevError::Data {
                reason: format!("failed to read {}: {}", path.display(), e),
            },
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| MeanrevError::Data {
            reason: format!("CSV header error in {}: {}", path.display(), e),
        })?;
        let layout = Layout {
            has_adjusted_close: headers.iter().any(|h| h == "adjusted_close"),
            has_split_coefficient: headers.iter().any(|h| h == "split_coefficient"),
        };

        let mut bars = Vec::new();
        let mut excluded = 0usize;
        for (line, result) in rdr.deserialize::<CsvRow>().enumerate() {
            let bar = match result {
                Ok(row) => row.into_bar(layout),
                Err(e) => {
                    debug!(symbol, line = line + 2, error = %e, "unreadable row");
                    None
                }
            };
            match bar {
                Some(bar) if window.contains(bar.date) => bars.push(bar),
                Some(_) => {}
                None => {
                    excluded += 1;
                    warn!(symbol, line = line + 2, "excluding malformed row");
                }
            }
        }

        if excluded > 0 {
            warn!(symbol, excluded, "rows excluded while loading");
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, MeanrevError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| MeanrevError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| MeanrevError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let path = entry.path();
            let is_csv = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if let (true, Some(stem)) = (is_csv, path.file_stem()) {
                symbols.push(stem.to_string_lossy().into_owned());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
