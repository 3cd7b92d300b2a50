//! Monte Carlo validation of a strategy against synthetic portfolios.
//!
//! Each trial replaces every instrument with a synthetic path calibrated to
//! that instrument's own drift and volatility, runs the strategy over it and
//! compares the aggregate return to the real one. A trial is a success when
//! the synthetic return does not beat the real return.
//!
//! Every (trial, symbol) pair draws from its own generator, seeded from the
//! master seed through BLAKE3. The draws therefore do not depend on how
//! trials are scheduled, and sequential and parallel sweeps agree exactly.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use statrs::distribution::Normal;
use tracing::{debug, info, warn};

use super::bar::Bar;
use super::error::MeanrevError;
use super::portfolio::Portfolio;
use super::strategy::Strategy;
use super::synthetic::{generate_path, DegenerateStats, NormalStream, PathStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct McConfig {
    pub iterations: usize,
    pub seed: u64,
    pub parallel: bool,
}

impl Default for McConfig {
    fn default() -> Self {
        McConfig {
            iterations: 50,
            seed: 42,
            parallel: true,
        }
    }
}

/// Seed for one instrument in one trial. Hash-derived, so it does not
/// depend on the order in which pairs are visited.
pub fn sub_seed(master_seed: u64, trial: u64, symbol: &str) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&master_seed.to_le_bytes());
    hasher.update(&trial.to_le_bytes());
    hasher.update(symbol.as_bytes());
    let hash = hasher.finalize();
    let mut word = [0u8; 8];
    word.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(word)
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrialOutcome {
    Completed { trial_return: f64 },
    Skipped { symbol: String, reason: DegenerateStats },
}

/// The lowest-indexed skipped trial, kept for the end-of-sweep warning.
#[derive(Debug, Clone, PartialEq)]
pub struct SkipNote {
    pub trial: u64,
    pub symbol: String,
    pub reason: DegenerateStats,
}

/// Running counts over folded trial outcomes.
///
/// Tallies over disjoint sets of trials combine with `merge`, giving the
/// same result whatever order the trials were folded in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct McTally {
    pub success: usize,
    pub failure: usize,
    pub skipped: usize,
    pub first_skip: Option<SkipNote>,
}

impl McTally {
    pub fn record(&mut self, trial: u64, outcome: TrialOutcome, real_return: f64) {
        match outcome {
            TrialOutcome::Completed { trial_return } if trial_return <= real_return => {
                self.success += 1
            }
            TrialOutcome::Completed { .. } => self.failure += 1,
            TrialOutcome::Skipped { symbol, reason } => {
                self.skipped += 1;
                self.note_skip(SkipNote {
                    trial,
                    symbol,
                    reason,
                });
            }
        }
    }

    pub fn merge(mut self, other: McTally) -> McTally {
        self.success += other.success;
        self.failure += other.failure;
        self.skipped += other.skipped;
        if let Some(note) = other.first_skip {
            self.note_skip(note);
        }
        self
    }

    fn note_skip(&mut self, note: SkipNote) {
        if self.first_skip.as_ref().is_none_or(|kept| note.trial < kept.trial) {
            self.first_skip = Some(note);
        }
    }

    pub fn valid(&self) -> usize {
        self.success + self.failure
    }

    /// `None` when no trial was valid.
    pub fn success_rate(&self) -> Option<f64> {
        match self.valid() {
            0 => None,
            n => Some(self.success as f64 / n as f64),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct McReport {
    pub real_return: f64,
    pub real_trades: usize,
    pub iterations: usize,
    pub valid_trials: usize,
    pub skipped_trials: usize,
    pub success_count: usize,
    pub success_rate: Option<f64>,
}

impl McReport {
    fn from_tally(real_return: f64, real_trades: usize, iterations: usize, tally: McTally) -> Self {
        McReport {
            real_return,
            real_trades,
            iterations,
            valid_trials: tally.valid(),
            skipped_trials: tally.skipped,
            success_count: tally.success,
            success_rate: tally.success_rate(),
        }
    }
}

fn check_path(path: &[Bar]) -> Result<(), DegenerateStats> {
    match path
        .iter()
        .position(|b| !(b.close.is_finite() && b.close > 0.0 && b.open.is_finite() && b.open > 0.0))
    {
        Some(index) => Err(DegenerateStats::NonPositivePrice { index }),
        None => Ok(()),
    }
}

/// A configured sweep over one strategy and one real portfolio.
pub struct MonteCarlo<'a> {
    strategy: &'a Strategy,
    portfolio: &'a Portfolio,
    config: McConfig,
    normal: Normal,
}

impl<'a> MonteCarlo<'a> {
    pub fn new(
        strategy: &'a Strategy,
        portfolio: &'a Portfolio,
        config: McConfig,
    ) -> Result<Self, MeanrevError> {
        let normal = Normal::new(0.0, 1.0).map_err(|e| MeanrevError::Sampler {
            reason: e.to_string(),
        })?;
        Ok(MonteCarlo {
            strategy,
            portfolio,
            config,
            normal,
        })
    }

    /// Build one synthetic portfolio and backtest it.
    ///
    /// Pure in `(strategy, portfolio, seed, trial)`: the same trial index
    /// always gives the same outcome.
    pub fn run_trial(&self, trial: u64) -> TrialOutcome {
        let mut synthetic = Portfolio::new();
        for (symbol, bars) in self.portfolio.iter() {
            let path = PathStats::estimate(bars).and_then(|stats| {
                let rng = StdRng::seed_from_u64(sub_seed(self.config.seed, trial, symbol));
                let path = generate_path(bars, &stats, &mut NormalStream::new(rng, self.normal));
                check_path(&path).map(|()| path)
            });
            match path {
                Ok(path) => synthetic.insert(symbol, path),
                Err(reason) => {
                    debug!(trial, symbol, %reason, "trial skipped");
                    return TrialOutcome::Skipped {
                        symbol: symbol.to_string(),
                        reason,
                    };
                }
            }
        }

        let result = self.strategy.backtest(&synthetic);
        debug!(
            trial,
            trades = result.trades.len(),
            trial_return = result.cumulative_return,
            "trial complete"
        );
        TrialOutcome::Completed {
            trial_return: result.cumulative_return,
        }
    }

    pub fn run(&self) -> Result<McReport, MeanrevError> {
        self.run_with_progress(|_, _| {})
    }

    /// Run the sweep, invoking `progress(trial, total)` after each trial.
    ///
    /// With `parallel` set, trials complete in any order, so the callback
    /// sees trial indices out of order.
    pub fn run_with_progress<F>(&self, progress: F) -> Result<McReport, MeanrevError>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        if self.portfolio.is_empty() {
            return Err(MeanrevError::EmptyPortfolio);
        }

        let real = self.strategy.backtest(self.portfolio);
        let total = self.config.iterations;
        info!(
            strategy = %self.strategy.name,
            real_return = real.cumulative_return,
            iterations = total,
            parallel = self.config.parallel,
            "starting monte carlo"
        );

        let real_return = real.cumulative_return;
        let run_one = |mut tally: McTally, trial: usize| {
            let outcome = self.run_trial(trial as u64);
            tally.record(trial as u64, outcome, real_return);
            progress(trial, total);
            tally
        };
        let tally = if self.config.parallel {
            (0..total)
                .into_par_iter()
                .fold(McTally::default, &run_one)
                .reduce(McTally::default, McTally::merge)
        } else {
            (0..total).fold(McTally::default(), &run_one)
        };

        if let Some(first) = &tally.first_skip {
            warn!(
                skipped = tally.skipped,
                first_trial = first.trial,
                symbol = %first.symbol,
                reason = %first.reason,
                "monte carlo trials skipped on degenerate statistics"
            );
        }

        Ok(McReport::from_tally(
            real_return,
            real.trades.len(),
            total,
            tally,
        ))
    }
}

pub fn run_monte_carlo(
    strategy: &Strategy,
    portfolio: &Portfolio,
    config: McConfig,
) -> Result<McReport, MeanrevError> {
    MonteCarlo::new(strategy, portfolio, config)?.run()
}

pub fn run_monte_carlo_with_progress<F>(
    strategy: &Strategy,
    portfolio: &Portfolio,
    config: McConfig,
    progress: F,
) -> Result<McReport, MeanrevError>
where
    F: Fn(usize, usize) + Send + Sync,
{
    MonteCarlo::new(strategy, portfolio, config)?.run_with_progress(progress)
}
