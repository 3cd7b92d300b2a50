//! Strategy composition: a feature provider plus an exit rule.

use std::fmt;

use crate::ports::feature_port::FeatureProvider;

use super::backtest::{run_backtest, BacktestResult};
use super::portfolio::{EnrichedPortfolio, Portfolio};
use super::position::StopRule;

/// Variants are composed, not subclassed: the same provider can run with or
/// without a stop.
pub struct Strategy {
    pub name: String,
    pub features: Box<dyn FeatureProvider>,
    pub stop: StopRule,
}

impl Strategy {
    pub fn new(name: impl Into<String>, features: Box<dyn FeatureProvider>, stop: StopRule) -> Self {
        Strategy {
            name: name.into(),
            features,
            stop,
        }
    }

    /// Real or synthetic portfolio through feature provider and runner.
    pub fn backtest(&self, portfolio: &Portfolio) -> BacktestResult {
        run_backtest(&enrich_portfolio(self, portfolio), &self.stop)
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy")
            .field("name", &self.name)
            .field("features", &self.features.name())
            .field("stop", &self.stop)
            .finish()
    }
}

pub fn enrich_portfolio(strategy: &Strategy, portfolio: &Portfolio) -> EnrichedPortfolio {
    portfolio
        .iter()
        .map(|(symbol, bars)| (symbol.to_string(), strategy.features.enrich(bars)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bar::Bar;
    use crate::domain::signal::{CloseSignal, EnrichedBar, OpenSignal};
    use chrono::NaiveDate;

    /// Opens long on the first bar and closes on the third.
    struct FirstAndThird;

    impl FeatureProvider for FirstAndThird {
        fn name(&self) -> &str {
            "first-and-third"
        }

        fn feature_names(&self) -> Vec<String> {
            vec!["index".into()]
        }

        fn enrich(&self, bars: &[Bar]) -> Vec<EnrichedBar> {
            bars.windows(2)
                .enumerate()
                .map(|(i, w)| EnrichedBar {
                    bar: w[0].clone(),
                    next_open: w[1].open,
                    open_signal: if i == 0 { OpenSignal::Long } else { OpenSignal::None },
                    close_signal: if i == 2 { CloseSignal::CloseAny } else { CloseSignal::None },
                    features: vec![i as f64],
                })
                .collect()
        }
    }

    fn bars(opens: &[f64]) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2021, 4, 5).unwrap();
        opens
            .iter()
            .enumerate()
            .map(|(i, &open)| Bar {
                date: start + chrono::Duration::days(i as i64),
                open,
                high: open,
                low: open,
                close: open,
                volume: 1.0,
                adjusted_close: open,
                split_coefficient: 1.0,
            })
            .collect()
    }

    #[test]
    fn enrich_keeps_symbols() {
        let strategy = Strategy::new("test", Box::new(FirstAndThird), StopRule::None);
        let mut portfolio = Portfolio::new();
        portfolio.insert("APA", bars(&[1.0, 2.0, 3.0, 4.0]));
        portfolio.insert("XOM", bars(&[1.0, 2.0, 3.0]));

        let enriched = enrich_portfolio(&strategy, &portfolio);

        assert_eq!(enriched.len(), 2);
        assert_eq!(enriched.get("APA").map(|b| b.len()), Some(3));
        assert_eq!(enriched.get("XOM").map(|b| b.len()), Some(2));
    }

    #[test]
    fn backtest_runs_provider_and_state_machine() {
        let strategy = Strategy::new("test", Box::new(FirstAndThird), StopRule::None);
        let mut portfolio = Portfolio::new();
        portfolio.insert("APA", bars(&[10.0, 20.0, 25.0, 30.0, 31.0]));

        let result = strategy.backtest(&portfolio);

        // open at bar 0 fills at 20, close at bar 2 fills at 30
        assert_eq!(result.trades.len(), 1);
        assert!((result.cumulative_return - 0.5).abs() < 1e-12);
    }

    #[test]
    fn debug_shows_provider_name() {
        let strategy = Strategy::new("s", Box::new(FirstAndThird), StopRule::FixedPercent(0.1));
        let text = format!("{strategy:?}");
        assert!(text.contains("first-and-third"));
        assert!(text.contains("FixedPercent"));
    }
}
