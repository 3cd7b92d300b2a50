//! Per-instrument position state machine.
//!
//! The machine is a pure fold over one instrument's enriched bars: each bar
//! maps the current [`PositionState`] to an [`Action`], and the action is
//! applied to the ledger. All fills happen at the bar's `next_open`.

use chrono::NaiveDate;
use tracing::trace;

use super::ledger::{LedgerError, TradeLedger, Transaction, TradeRecord};
use super::position::{stop_hit, Direction, OpenPosition, PositionState, StopRule};
use super::signal::{CloseSignal, EnrichedBar, OpenSignal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Signal,
    StopLoss,
}

/// What a single bar asks of the state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Hold,
    Open {
        direction: Direction,
        price: f64,
        stop_price: Option<f64>,
    },
    Close {
        reason: ExitReason,
        price: f64,
    },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InstrumentError {
    #[error("{source} (open_signal={open_signal}, close_signal={close_signal})")]
    Ledger {
        #[source]
        source: LedgerError,
        open_signal: OpenSignal,
        close_signal: CloseSignal,
    },

    #[error("invalid execution price {price} for {symbol} on {date}")]
    InvalidExecutionPrice {
        symbol: String,
        date: NaiveDate,
        price: f64,
    },
}

/// Output of one instrument's run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InstrumentRun {
    pub transactions: Vec<Transaction>,
    pub trades: Vec<TradeRecord>,
    /// Position still open when the bars ran out. Unrealized, so it has no
    /// trade record.
    pub open_at_end: Option<OpenPosition>,
}

/// Decide the action for one bar.
///
/// Opening is only considered while flat; while open, a matching close
/// signal wins over the stop, and open signals are ignored.
pub fn step(state: &PositionState, bar: &EnrichedBar, stop: &StopRule) -> Action {
    match state {
        PositionState::Flat => match bar.open_signal.direction() {
            Some(direction) => Action::Open {
                direction,
                price: bar.next_open,
                stop_price: stop.stop_price(direction, bar.next_open),
            },
            None => Action::Hold,
        },
        PositionState::Open(pos) => {
            if bar.close_signal.closes(pos.direction) {
                Action::Close {
                    reason: ExitReason::Signal,
                    price: bar.next_open,
                }
            } else if stop_hit(pos, bar.close()) {
                Action::Close {
                    reason: ExitReason::StopLoss,
                    price: bar.next_open,
                }
            } else {
                Action::Hold
            }
        }
    }
}

fn check_price(symbol: &str, bar: &EnrichedBar, price: f64) -> Result<(), InstrumentError> {
    if price.is_finite() && price > 0.0 {
        Ok(())
    } else {
        Err(InstrumentError::InvalidExecutionPrice {
            symbol: symbol.to_string(),
            date: bar.date(),
            price,
        })
    }
}

fn apply(
    state: PositionState,
    action: Action,
    symbol: &str,
    bar: &EnrichedBar,
    ledger: &mut TradeLedger,
) -> Result<PositionState, InstrumentError> {
    let with_context = |source: LedgerError| InstrumentError::Ledger {
        source,
        open_signal: bar.open_signal,
        close_signal: bar.close_signal,
    };

    match action {
        Action::Hold => Ok(state),
        Action::Open {
            direction,
            price,
            stop_price,
        } => {
            check_price(symbol, bar, price)?;
            ledger
                .record_open(symbol, bar.date(), direction, price)
                .map_err(with_context)?;
            trace!(symbol, date = %bar.date(), %direction, price, "open");
            Ok(PositionState::Open(OpenPosition {
                direction,
                entry_date: bar.date(),
                entry_price: price,
                stop_price,
            }))
        }
        Action::Close { reason, price } => {
            check_price(symbol, bar, price)?;
            let trade = ledger
                .record_close(symbol, bar.date(), price)
                .map_err(with_context)?;
            trace!(
                symbol,
                date = %bar.date(),
                ?reason,
                price,
                trade_return = trade.trade_return,
                "close"
            );
            Ok(PositionState::Flat)
        }
    }
}

/// Run one instrument's enriched bars through the state machine.
///
/// Any error aborts this instrument only; the partial ledger is discarded.
pub fn run_instrument(
    symbol: &str,
    bars: &[EnrichedBar],
    stop: &StopRule,
) -> Result<InstrumentRun, InstrumentError> {
    let mut ledger = TradeLedger::new();
    let final_state = bars.iter().try_fold(PositionState::Flat, |state, bar| {
        let action = step(&state, bar, stop);
        apply(state, action, symbol, bar, &mut ledger)
    })?;

    let (transactions, trades) = ledger.into_parts();
    Ok(InstrumentRun {
        transactions,
        trades,
        open_at_end: final_state.open_position().copied(),
    })
}
