//! Synthetic price paths with matched drift and volatility.
//!
//! Closes follow a geometric random walk seeded at the real first close:
//! `close'_t = close'_{t-1} * exp(d + σ·Z_t)` with `d = μ − σ²/2` taken from
//! the real log returns. Opens are `close'_{t-1} * (1 + σ_oc·Z)`, where
//! `σ_oc` is the population std of the real `(close − open) / close`.
//!
//! High, low, volume and split coefficient are copied from the real bars
//! unchanged, so a synthetic close can sit outside the real high/low range.
//! That is a known approximation: only open and close are resampled.

use rand::Rng;
use statrs::distribution::Normal;
use statrs::statistics::Statistics;

use super::bar::Bar;
use super::portfolio::MIN_BARS;

/// Why a series cannot be calibrated. The Monte Carlo trial that hit it is
/// skipped rather than counted.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum DegenerateStats {
    #[error("series has {bars} bars, need at least {min}", min = MIN_BARS)]
    TooFewBars { bars: usize },

    #[error("non-positive or non-finite price at bar {index}")]
    NonPositivePrice { index: usize },

    #[error("log-return variance is undefined")]
    UndefinedVariance,

    #[error("log-return variance is zero")]
    ZeroVariance,
}

/// Calibration of one instrument's real series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathStats {
    pub mean: f64,
    pub variance: f64,
    pub drift: f64,
    pub sigma: f64,
    pub sigma_open_close: f64,
}

impl PathStats {
    pub fn estimate(bars: &[Bar]) -> Result<Self, DegenerateStats> {
        if bars.len() < MIN_BARS {
            return Err(DegenerateStats::TooFewBars { bars: bars.len() });
        }
        if let Some(index) = bars
            .iter()
            .position(|b| !(b.close.is_finite() && b.close > 0.0 && b.open.is_finite()))
        {
            return Err(DegenerateStats::NonPositivePrice { index });
        }

        let log_returns: Vec<f64> = bars
            .windows(2)
            .map(|w| (w[1].close / w[0].close).ln())
            .collect();
        let mean = log_returns.iter().mean();
        let variance = log_returns.iter().variance();
        if !variance.is_finite() || !mean.is_finite() {
            return Err(DegenerateStats::UndefinedVariance);
        }
        if variance == 0.0 {
            return Err(DegenerateStats::ZeroVariance);
        }

        let sigma_open_close = bars.iter().map(Bar::intraday_gap).population_std_dev();
        if !sigma_open_close.is_finite() {
            return Err(DegenerateStats::UndefinedVariance);
        }

        Ok(PathStats {
            mean,
            variance,
            drift: mean - variance / 2.0,
            sigma: variance.sqrt(),
            sigma_open_close,
        })
    }
}

/// Stream of independent standard-normal draws.
pub trait NormalSource {
    fn next_standard_normal(&mut self) -> f64;
}

/// Standard normals drawn from any `rand` generator.
pub struct NormalStream<R> {
    rng: R,
    normal: Normal,
}

impl<R: Rng> NormalStream<R> {
    /// `normal` is expected to be N(0, 1).
    pub fn new(rng: R, normal: Normal) -> Self {
        NormalStream { rng, normal }
    }
}

impl<R: Rng> NormalSource for NormalStream<R> {
    fn next_standard_normal(&mut self) -> f64 {
        self.rng.sample(self.normal)
    }
}

/// Build a same-length synthetic series from `bars`.
///
/// Consumes `days - 1` close innovations, then `days - 1` open innovations.
pub fn generate_path<N: NormalSource + ?Sized>(
    bars: &[Bar],
    stats: &PathStats,
    normals: &mut N,
) -> Vec<Bar> {
    let Some(first) = bars.first() else {
        return Vec::new();
    };
    let steps = bars.len() - 1;

    let close_shocks: Vec<f64> = (0..steps).map(|_| normals.next_standard_normal()).collect();
    let open_shocks: Vec<f64> = (0..steps).map(|_| normals.next_standard_normal()).collect();

    let mut closes = Vec::with_capacity(bars.len());
    closes.push(first.close);
    for z in &close_shocks {
        let prev = closes[closes.len() - 1];
        closes.push(prev * (stats.drift + stats.sigma * z).exp());
    }

    let opens = std::iter::once(first.open).chain(
        closes
            .iter()
            .zip(&open_shocks)
            .map(|(prev_close, z)| prev_close * (1.0 + stats.sigma_open_close * z)),
    );

    bars.iter()
        .zip(opens)
        .zip(closes.iter())
        .map(|((real, open), &close)| Bar {
            open,
            close,
            adjusted_close: close,
            ..real.clone()
        })
        .collect()
}
