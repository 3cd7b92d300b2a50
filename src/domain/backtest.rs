//! Backtest runner: drives every instrument through the state machine and
//! aggregates the ledgers.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use super::execution::{run_instrument, InstrumentError};
use super::ledger::{TradeRecord, Transaction};
use super::portfolio::EnrichedPortfolio;
use super::position::StopRule;

/// An instrument whose run was aborted. Its partial output is discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedInstrument {
    pub symbol: String,
    pub error: InstrumentError,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BacktestResult {
    pub trades: Vec<TradeRecord>,
    pub transactions: Vec<Transaction>,
    /// Sum of trade returns. A ratio, not a percentage.
    pub cumulative_return: f64,
    pub open_at_end: BTreeSet<String>,
    pub failed: Vec<FailedInstrument>,
}

impl BacktestResult {
    pub fn instruments_failed(&self) -> usize {
        self.failed.len()
    }
}

/// Run every instrument independently, in symbol order.
///
/// No randomness and no shared state between instruments, so identical
/// inputs give bit-identical output.
pub fn run_backtest(portfolio: &EnrichedPortfolio, stop: &StopRule) -> BacktestResult {
    let mut result = BacktestResult::default();

    for (symbol, bars) in portfolio.iter() {
        match run_instrument(symbol, bars, stop) {
            Ok(run) => {
                debug!(symbol, trades = run.trades.len(), "instrument complete");
                if let Some(pos) = run.open_at_end {
                    info!(
                        symbol,
                        direction = %pos.direction,
                        entry_date = %pos.entry_date,
                        entry_price = pos.entry_price,
                        "position still open at end of window"
                    );
                    result.open_at_end.insert(symbol.to_string());
                }
                result.transactions.extend(run.transactions);
                result.trades.extend(run.trades);
            }
            Err(error) => {
                warn!(symbol, %error, "instrument aborted");
                result.failed.push(FailedInstrument {
                    symbol: symbol.to_string(),
                    error,
                });
            }
        }
    }

    result.cumulative_return = result.trades.iter().map(|t| t.trade_return).sum();
    result
}
