//! Append-only transaction log and closed-trade accounting.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

use super::position::Direction;

/// Ledger misuse. Only reachable when the signal stream or the state
/// machine is defective.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("close for {symbol} on {date} with no open position")]
    UnmatchedClose { symbol: String, date: NaiveDate },

    #[error("open for {symbol} on {date} while a position is already open")]
    DoubleOpen { symbol: String, date: NaiveDate },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub symbol: String,
    pub date: NaiveDate,
    pub direction: Direction,
    pub is_close: bool,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub entry_date: NaiveDate,
    pub close_date: NaiveDate,
    /// Calendar days between entry and close; `None` when the dates are out
    /// of order and no meaningful holding period exists.
    pub days_held: Option<i64>,
    pub direction: Direction,
    pub entry_price: f64,
    pub close_price: f64,
    #[serde(rename = "return")]
    pub trade_return: f64,
}

impl TradeRecord {
    pub fn is_winner(&self) -> bool {
        self.trade_return > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.trade_return < 0.0
    }
}

/// direction × (close / entry − 1)
pub fn trade_return(direction: Direction, entry_price: f64, close_price: f64) -> f64 {
    direction.sign() * (close_price / entry_price - 1.0)
}

pub fn days_between(entry: NaiveDate, close: NaiveDate) -> Option<i64> {
    let days = (close - entry).num_days();
    (days >= 0).then_some(days)
}

/// Transactions and trade records for one backtest run.
///
/// Each `record_close` pairs with the most recent unmatched open for the
/// same symbol. Entries are never mutated after insertion.
#[derive(Debug, Clone, Default)]
pub struct TradeLedger {
    transactions: Vec<Transaction>,
    trades: Vec<TradeRecord>,
    open: HashMap<String, usize>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_open(
        &mut self,
        symbol: &str,
        date: NaiveDate,
        direction: Direction,
        price: f64,
    ) -> Result<(), LedgerError> {
        if self.open.contains_key(symbol) {
            return Err(LedgerError::DoubleOpen {
                symbol: symbol.to_string(),
                date,
            });
        }
        self.open.insert(symbol.to_string(), self.transactions.len());
        self.transactions.push(Transaction {
            symbol: symbol.to_string(),
            date,
            direction,
            is_close: false,
            price,
        });
        Ok(())
    }

    /// Append the close and the paired trade record, returning the record.
    pub fn record_close(
        &mut self,
        symbol: &str,
        date: NaiveDate,
        price: f64,
    ) -> Result<&TradeRecord, LedgerError> {
        let idx = self
            .open
            .remove(symbol)
            .ok_or_else(|| LedgerError::UnmatchedClose {
                symbol: symbol.to_string(),
                date,
            })?;
        let (direction, entry_date, entry_price) = {
            let opening = &self.transactions[idx];
            (opening.direction, opening.date, opening.price)
        };

        self.transactions.push(Transaction {
            symbol: symbol.to_string(),
            date,
            direction,
            is_close: true,
            price,
        });
        self.trades.push(TradeRecord {
            symbol: symbol.to_string(),
            entry_date,
            close_date: date,
            days_held: days_between(entry_date, date),
            direction,
            entry_price,
            close_price: price,
            trade_return: trade_return(direction, entry_price, price),
        });
        Ok(&self.trades[self.trades.len() - 1])
    }

    pub fn into_parts(self) -> (Vec<Transaction>, Vec<TradeRecord>) {
        (self.transactions, self.trades)
    }
}
