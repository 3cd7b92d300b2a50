//! Trailing-window helpers shared by feature providers.
//!
//! Every helper returns a series aligned with its input. A position is NaN
//! until a full window is available, and stays NaN while any value in its
//! window is NaN.

fn rolling(values: &[f64], period: usize, reduce: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if period == 0 || i + 1 < period {
                return f64::NAN;
            }
            let window = &values[i + 1 - period..=i];
            if window.iter().any(|v| v.is_nan()) {
                f64::NAN
            } else {
                reduce(window)
            }
        })
        .collect()
}

pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    rolling(values, period, |w| w.iter().sum::<f64>() / w.len() as f64)
}

/// Sample standard deviation (divides by N - 1). NaN for a period of 1.
pub fn rolling_std(values: &[f64], period: usize) -> Vec<f64> {
    rolling(values, period, |w| {
        if w.len() < 2 {
            return f64::NAN;
        }
        let mean = w.iter().sum::<f64>() / w.len() as f64;
        let ss: f64 = w.iter().map(|v| (v - mean) * (v - mean)).sum();
        (ss / (w.len() - 1) as f64).sqrt()
    })
}

pub fn rolling_max(values: &[f64], period: usize) -> Vec<f64> {
    rolling(values, period, |w| w.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

pub fn rolling_min(values: &[f64], period: usize) -> Vec<f64> {
    rolling(values, period, |w| w.iter().copied().fold(f64::INFINITY, f64::min))
}

/// First difference; position 0 is NaN.
pub fn diff(values: &[f64]) -> Vec<f64> {
    std::iter::once(f64::NAN)
        .chain(values.windows(2).map(|w| w[1] - w[0]))
        .take(values.len())
        .collect()
}
