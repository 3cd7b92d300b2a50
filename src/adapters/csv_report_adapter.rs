//! CSV report adapter implementing ReportPort.
//!
//! Writes `trades.csv` and `transactions.csv` into the output directory.
//! Direction is written as `1` / `-1`; an undefined holding period is an
//! empty field.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::MeanrevError;
use crate::ports::report_port::ReportPort;

pub const TRADES_FILE: &str = "trades.csv";
pub const TRANSACTIONS_FILE: &str = "transactions.csv";

const TRADE_COLUMNS: [&str; 8] = [
    "symbol",
    "entry_date",
    "close_date",
    "days_held",
    "direction",
    "entry_price",
    "close_price",
    "return",
];
const TRANSACTION_COLUMNS: [&str; 5] = ["symbol", "date", "direction", "is_close", "price"];

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

/// The header is written explicitly so an empty run still yields a
/// readable file.
fn write_rows<T: Serialize>(path: &Path, columns: &[&str], rows: &[T]) -> Result<(), MeanrevError> {
    let report_err = |e: csv::Error| MeanrevError::Report {
        reason: format!("failed to write {}: {}", path.display(), e),
    };

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(report_err)?;
    wtr.write_record(columns).map_err(report_err)?;
    for row in rows {
        wtr.serialize(row).map_err(report_err)?;
    }
    wtr.flush()?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write_backtest(&self, result: &BacktestResult, output_dir: &Path) -> Result<(), MeanrevError> {
        fs::create_dir_all(output_dir)?;

        let trades_path = output_dir.join(TRADES_FILE);
        let transactions_path = output_dir.join(TRANSACTIONS_FILE);
        write_rows(&trades_path, &TRADE_COLUMNS, &result.trades)?;
        write_rows(&transactions_path, &TRANSACTION_COLUMNS, &result.transactions)?;

        info!(
            dir = %output_dir.display(),
            trades = result.trades.len(),
            transactions = result.transactions.len(),
            "report written"
        );
        Ok(())
    }
}
