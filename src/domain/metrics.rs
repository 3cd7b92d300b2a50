//! Trade-level statistics over closed trade records.

use std::collections::BTreeMap;

use super::ledger::TradeRecord;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TradeStats {
    pub total_trades: usize,
    pub winners: usize,
    pub losers: usize,
    pub breakeven: usize,
    pub win_rate: f64,
    pub total_return: f64,
    pub mean_return: f64,
    pub best_return: f64,
    pub worst_return: f64,
    pub profit_factor: f64,
    /// Mean over trades with a defined holding period; `None` if there are none.
    pub mean_days_held: Option<f64>,
}

impl TradeStats {
    pub fn compute(trades: &[TradeRecord]) -> Self {
        if trades.is_empty() {
            return TradeStats::default();
        }

        let mut winners = 0usize;
        let mut losers = 0usize;
        let mut breakeven = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut best_return = f64::NEG_INFINITY;
        let mut worst_return = f64::INFINITY;
        let mut days_total = 0i64;
        let mut days_count = 0usize;

        for trade in trades {
            let r = trade.trade_return;
            if r > 0.0 {
                winners += 1;
                total_wins += r;
            } else if r < 0.0 {
                losers += 1;
                total_losses += r.abs();
            } else {
                breakeven += 1;
            }
            best_return = best_return.max(r);
            worst_return = worst_return.min(r);

            if let Some(days) = trade.days_held {
                days_total += days;
                days_count += 1;
            }
        }

        let total_trades = trades.len();
        let total_return: f64 = trades.iter().map(|t| t.trade_return).sum();

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        TradeStats {
            total_trades,
            winners,
            losers,
            breakeven,
            win_rate: winners as f64 / total_trades as f64,
            total_return,
            mean_return: total_return / total_trades as f64,
            best_return,
            worst_return,
            profit_factor,
            mean_days_held: (days_count > 0).then(|| days_total as f64 / days_count as f64),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolSummary {
    pub symbol: String,
    pub total_trades: usize,
    pub winners: usize,
    pub losers: usize,
    pub win_rate: f64,
    pub total_return: f64,
}

impl SymbolSummary {
    /// One summary per traded symbol, in symbol order.
    pub fn compute_per_symbol(trades: &[TradeRecord]) -> Vec<SymbolSummary> {
        let mut by_symbol: BTreeMap<&str, Vec<&TradeRecord>> = BTreeMap::new();
        for trade in trades {
            by_symbol.entry(trade.symbol.as_str()).or_default().push(trade);
        }

        by_symbol
            .into_iter()
            .map(|(symbol, trades)| {
                let winners = trades.iter().filter(|t| t.is_winner()).count();
                let losers = trades.iter().filter(|t| t.is_loser()).count();
                SymbolSummary {
                    symbol: symbol.to_string(),
                    total_trades: trades.len(),
                    winners,
                    losers,
                    win_rate: winners as f64 / trades.len() as f64,
                    total_return: trades.iter().map(|t| t.trade_return).sum(),
                }
            })
            .collect()
    }
}

/// The `n` largest positive returns, biggest first.
pub fn top_winners(trades: &[TradeRecord], n: usize) -> Vec<&TradeRecord> {
    let mut winners: Vec<&TradeRecord> = trades.iter().filter(|t| t.is_winner()).collect();
    winners.sort_by(|a, b| b.trade_return.total_cmp(&a.trade_return));
    winners.truncate(n);
    winners
}

/// The `n` largest negative returns, worst first.
pub fn top_losers(trades: &[TradeRecord], n: usize) -> Vec<&TradeRecord> {
    let mut losers: Vec<&TradeRecord> = trades.iter().filter(|t| t.is_loser()).collect();
    losers.sort_by(|a, b| a.trade_return.total_cmp(&b.trade_return));
    losers.truncate(n);
    losers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::Direction;
    use chrono::NaiveDate;

    fn make_trade(symbol: &str, trade_return: f64, days: Option<i64>) -> TradeRecord {
        let entry = NaiveDate::from_ymd_opt(2018, 2, 1).unwrap();
        TradeRecord {
            symbol: symbol.into(),
            entry_date: entry,
            close_date: entry + chrono::Duration::days(days.unwrap_or(0)),
            days_held: days,
            direction: Direction::Long,
            entry_price: 100.0,
            close_price: 100.0 * (1.0 + trade_return),
            trade_return,
        }
    }

    #[test]
    fn stats_empty() {
        let stats = TradeStats::compute(&[]);
        assert_eq!(stats.total_trades, 0);
        assert_eq!(stats.win_rate, 0.0);
        assert_eq!(stats.mean_days_held, None);
    }

    #[test]
    fn stats_wins_losses_breakeven() {
        let trades = vec![
            make_trade("APA", 0.10, Some(4)),
            make_trade("APA", -0.05, Some(2)),
            make_trade("XOM", 0.0, Some(6)),
            make_trade("XOM", 0.20, None),
        ];
        let stats = TradeStats::compute(&trades);

        assert_eq!(stats.total_trades, 4);
        assert_eq!(stats.winners, 2);
        assert_eq!(stats.losers, 1);
        assert_eq!(stats.breakeven, 1);
        assert!((stats.win_rate - 0.5).abs() < f64::EPSILON);
        assert!((stats.total_return - 0.25).abs() < 1e-12);
        assert!((stats.mean_return - 0.0625).abs() < 1e-12);
        assert!((stats.best_return - 0.20).abs() < f64::EPSILON);
        assert!((stats.worst_return + 0.05).abs() < f64::EPSILON);
        assert!((stats.profit_factor - 6.0).abs() < 1e-12);
        // undefined holding periods are skipped
        assert_eq!(stats.mean_days_held, Some(4.0));
    }

    #[test]
    fn profit_factor_without_losses_is_infinite() {
        let stats = TradeStats::compute(&[make_trade("APA", 0.1, Some(1))]);
        assert!(stats.profit_factor.is_infinite());
    }

    #[test]
    fn per_symbol_summary() {
        let trades = vec![
            make_trade("XOM", 0.10, Some(1)),
            make_trade("APA", -0.02, Some(1)),
            make_trade("XOM", -0.04, Some(1)),
        ];
        let summaries = SymbolSummary::compute_per_symbol(&trades);

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].symbol, "APA");
        assert_eq!(summaries[0].total_trades, 1);
        assert_eq!(summaries[0].losers, 1);
        assert_eq!(summaries[1].symbol, "XOM");
        assert_eq!(summaries[1].winners, 1);
        assert!((summaries[1].win_rate - 0.5).abs() < f64::EPSILON);
        assert!((summaries[1].total_return - 0.06).abs() < 1e-12);
    }

    #[test]
    fn winners_sorted_biggest_first() {
        let trades = vec![
            make_trade("A", 0.05, None),
            make_trade("B", 0.30, None),
            make_trade("C", -0.50, None),
            make_trade("D", 0.10, None),
        ];
        let top = top_winners(&trades, 2);
        let symbols: Vec<&str> = top.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["B", "D"]);
    }

    #[test]
    fn losers_sorted_worst_first() {
        let trades = vec![
            make_trade("A", -0.05, None),
            make_trade("B", 0.30, None),
            make_trade("C", -0.50, None),
        ];
        let top = top_losers(&trades, 5);
        let symbols: Vec<&str> = top.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["C", "A"]);
    }
}
