//! Data access port trait.

use crate::domain::bar::{Bar, DateWindow};
use crate::domain::error::MeanrevError;

pub trait DataPort {
    /// Bars for `symbol` inside `window`, oldest first.
    fn fetch_bars(&self, symbol: &str, window: &DateWindow) -> Result<Vec<Bar>, MeanrevError>;

    fn list_symbols(&self) -> Result<Vec<String>, MeanrevError>;
}
