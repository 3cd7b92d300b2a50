//! Bollinger-band squeeze feature provider.
//!
//! Bands use a simple moving average and the sample standard deviation of
//! the close over `window` bars:
//! - upper / lower: `ma ± width × std`
//! - perc_b: `(close − lower) / (upper − lower)`, 0 on the lower band, 1 on the upper
//! - bandwidth: `(upper − lower) / ma`
//!
//! A squeeze is recorded when bandwidth drops below `squeeze_factor` times
//! its trailing `bandwidth_window` minimum, and stays armed for
//! `squeeze_lookback` bars. An armed squeeze opens short below
//! `perc_b_lower_threshold` and long above `perc_b_upper_threshold`. Any
//! open position is closed once bandwidth expands past `expansion_factor`
//! times its trailing maximum.
//!
//! Warm-up rows carry NaN features and no signals.

use crate::domain::bar::Bar;
use crate::domain::indicator_helpers::{diff, rolling_max, rolling_mean, rolling_min, rolling_std};
use crate::domain::signal::{CloseSignal, EnrichedBar, OpenSignal};
use crate::ports::feature_port::FeatureProvider;

pub const FEATURE_NAMES: [&str; 12] = [
    "ma",
    "std",
    "bollinger_high",
    "bollinger_low",
    "perc_b",
    "bandwidth",
    "bandwidth_high",
    "bandwidth_low",
    "thin_band",
    "thick_band",
    "intensity",
    "trend",
];

const INTENSITY_WINDOW: usize = 20;
const TREND_WINDOW: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct SqueezeParams {
    pub window: usize,
    pub width: f64,
    pub bandwidth_window: usize,
    pub squeeze_factor: f64,
    pub squeeze_lookback: usize,
    pub expansion_factor: f64,
    pub perc_b_upper_threshold: f64,
    pub perc_b_lower_threshold: f64,
}

impl Default for SqueezeParams {
    fn default() -> Self {
        SqueezeParams {
            window: 20,
            width: 2.0,
            bandwidth_window: 125,
            squeeze_factor: 1.1,
            squeeze_lookback: 5,
            expansion_factor: 0.8,
            perc_b_upper_threshold: 1.0,
            perc_b_lower_threshold: 0.0,
        }
    }
}

/// Indicator columns for one instrument, aligned with its raw bars.
#[derive(Debug, Clone, PartialEq)]
struct Columns {
    ma: Vec<f64>,
    std: Vec<f64>,
    upper: Vec<f64>,
    lower: Vec<f64>,
    perc_b: Vec<f64>,
    bandwidth: Vec<f64>,
    bw_high: Vec<f64>,
    bw_low: Vec<f64>,
    thin_band: Vec<bool>,
    thick_band: Vec<bool>,
    intensity: Vec<f64>,
    trend: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BollingerSqueeze {
    params: SqueezeParams,
}

impl BollingerSqueeze {
    pub fn new(params: SqueezeParams) -> Self {
        BollingerSqueeze { params }
    }

    fn columns(&self, bars: &[Bar]) -> Columns {
        let p = &self.params;
        let close: Vec<f64> = bars.iter().map(|b| b.close).collect();

        let ma = rolling_mean(&close, p.window);
        let std = rolling_std(&close, p.window);
        let upper: Vec<f64> = ma.iter().zip(&std).map(|(m, s)| m + p.width * s).collect();
        let lower: Vec<f64> = ma.iter().zip(&std).map(|(m, s)| m - p.width * s).collect();

        let perc_b: Vec<f64> = (0..bars.len())
            .map(|i| (close[i] - lower[i]) / (upper[i] - lower[i]))
            .collect();
        let bandwidth: Vec<f64> = (0..bars.len())
            .map(|i| (upper[i] - lower[i]) / ma[i])
            .collect();
        let bw_high = rolling_max(&bandwidth, p.bandwidth_window);
        let bw_low = rolling_min(&bandwidth, p.bandwidth_window);

        // NaN comparisons are false, so warm-up rows never touch
        let thin_touch: Vec<bool> = bandwidth
            .iter()
            .zip(&bw_low)
            .map(|(bw, low)| *bw < p.squeeze_factor * low)
            .collect();
        let thin_band: Vec<bool> = (0..bars.len())
            .map(|i| {
                p.squeeze_lookback > 0
                    && i + 1 >= p.squeeze_lookback
                    && thin_touch[i + 1 - p.squeeze_lookback..=i].iter().any(|&t| t)
            })
            .collect();
        let thick_band: Vec<bool> = bandwidth
            .iter()
            .zip(&bw_high)
            .map(|(bw, high)| *bw > p.expansion_factor * high)
            .collect();

        let raw_intensity: Vec<f64> = bars
            .iter()
            .map(|b| (2.0 * b.close - b.high - b.low) / ((b.high - b.low) * b.volume))
            .collect();
        let intensity = rolling_mean(&raw_intensity, INTENSITY_WINDOW);
        let trend = rolling_mean(&diff(&ma), TREND_WINDOW);

        Columns {
            ma,
            std,
            upper,
            lower,
            perc_b,
            bandwidth,
            bw_high,
            bw_low,
            thin_band,
            thick_band,
            intensity,
            trend,
        }
    }

    fn open_signal(&self, thin_band: bool, perc_b: f64) -> OpenSignal {
        if !thin_band {
            OpenSignal::None
        } else if perc_b < self.params.perc_b_lower_threshold {
            OpenSignal::Short
        } else if perc_b > self.params.perc_b_upper_threshold {
            OpenSignal::Long
        } else {
            OpenSignal::None
        }
    }
}

fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

impl FeatureProvider for BollingerSqueeze {
    fn name(&self) -> &str {
        "bollinger_squeeze"
    }

    fn feature_names(&self) -> Vec<String> {
        FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
    }

    fn enrich(&self, bars: &[Bar]) -> Vec<EnrichedBar> {
        let c = self.columns(bars);

        bars.windows(2)
            .enumerate()
            .map(|(i, pair)| EnrichedBar {
                bar: pair[0].clone(),
                next_open: pair[1].open,
                open_signal: self.open_signal(c.thin_band[i], c.perc_b[i]),
                close_signal: if c.thick_band[i] {
                    CloseSignal::CloseAny
                } else {
                    CloseSignal::None
                },
                features: vec![
                    c.ma[i],
                    c.std[i],
                    c.upper[i],
                    c.lower[i],
                    c.perc_b[i],
                    c.bandwidth[i],
                    c.bw_high[i],
                    c.bw_low[i],
                    flag(c.thin_band[i]),
                    flag(c.thick_band[i]),
                    c.intensity[i],
                    c.trend[i],
                ],
            })
            .collect()
    }
}
