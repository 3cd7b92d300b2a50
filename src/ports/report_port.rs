//! Report generation port trait.

use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::MeanrevError;

/// Port for persisting backtest output.
pub trait ReportPort {
    fn write_backtest(&self, result: &BacktestResult, output_dir: &Path) -> Result<(), MeanrevError>;
}
