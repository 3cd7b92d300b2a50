//! Configuration validation.
//!
//! Validates every config field before a run so that bad values surface
//! with their section and key instead of as silent defaults.

use crate::domain::error::MeanrevError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_all(config: &dyn ConfigPort) -> Result<(), MeanrevError> {
    validate_data_config(config)?;
    validate_strategy_config(config)?;
    validate_monte_carlo_config(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), MeanrevError> {
    validate_directory(config)?;
    validate_symbols(config)?;
    validate_dates(config)?;
    ensure_bool(config, "data", "cleanse")?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), MeanrevError> {
    for key in ["window", "bandwidth_window", "squeeze_lookback"] {
        ensure_integer(config, "strategy", key)?;
    }
    for key in [
        "width",
        "squeeze_factor",
        "expansion_factor",
        "perc_b_upper_threshold",
        "perc_b_lower_threshold",
        "stop_loss_perc",
    ] {
        ensure_numeric(config, "strategy", key)?;
    }
    validate_windows(config)?;
    validate_band_factors(config)?;
    validate_thresholds(config)?;
    validate_stop_loss(config)?;
    Ok(())
}

pub fn validate_monte_carlo_config(config: &dyn ConfigPort) -> Result<(), MeanrevError> {
    ensure_integer(config, "monte_carlo", "iterations")?;
    ensure_bool(config, "monte_carlo", "parallel")?;
    if config.get_int("monte_carlo", "iterations", 0) < 0 {
        return Err(MeanrevError::invalid(
            "monte_carlo",
            "iterations",
            "iterations must be non-negative",
        ));
    }
    if let Some(seed) = config.get_string("monte_carlo", "seed") {
        if seed.trim().parse::<u64>().is_err() {
            return Err(MeanrevError::invalid(
                "monte_carlo",
                "seed",
                "seed must be a non-negative integer",
            ));
        }
    }
    Ok(())
}

/// A present key must parse as a number; a missing key takes its default.
fn ensure_numeric(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), MeanrevError> {
    match config.get_string(section, key) {
        Some(v) if v.trim().parse::<f64>().is_err() => Err(MeanrevError::invalid(
            section,
            key,
            format!("{key} must be a number, got '{v}'"),
        )),
        _ => Ok(()),
    }
}

fn ensure_integer(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), MeanrevError> {
    match config.get_string(section, key) {
        Some(v) if v.trim().parse::<i64>().is_err() => Err(MeanrevError::invalid(
            section,
            key,
            format!("{key} must be an integer, got '{v}'"),
        )),
        _ => Ok(()),
    }
}

/// Accepts the same spellings as `ConfigPort::get_bool`.
fn ensure_bool(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), MeanrevError> {
    match config.get_string(section, key) {
        Some(v)
            if !matches!(
                v.trim().to_lowercase().as_str(),
                "true" | "yes" | "1" | "false" | "no" | "0"
            ) =>
        {
            Err(MeanrevError::invalid(
                section,
                key,
                format!("{key} must be true or false, got '{v}'"),
            ))
        }
        _ => Ok(()),
    }
}

fn validate_directory(config: &dyn ConfigPort) -> Result<(), MeanrevError> {
    match config.get_string("data", "directory") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(MeanrevError::ConfigMissing {
            section: "data".to_string(),
            key: "directory".to_string(),
        }),
    }
}

fn validate_symbols(config: &dyn ConfigPort) -> Result<(), MeanrevError> {
    match config.get_string("data", "symbols") {
        Some(s) if parse_symbols(&s).is_empty() => Err(MeanrevError::invalid(
            "data",
            "symbols",
            "symbols must list at least one symbol when present",
        )),
        _ => Ok(()),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), MeanrevError> {
    let start = optional_date(config, "start_date")?;
    let end = optional_date(config, "end_date")?;

    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(MeanrevError::invalid(
                "data",
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }
    Ok(())
}

/// Parse an optional `[data]` date key.
pub fn optional_date(config: &dyn ConfigPort, key: &str) -> Result<Option<NaiveDate>, MeanrevError> {
    match config.get_string("data", key) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                MeanrevError::invalid("data", key, format!("invalid {key} format, expected YYYY-MM-DD"))
            }),
    }
}

/// Comma-separated symbol list, trimmed and upper-cased, blanks dropped.
pub fn parse_symbols(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn validate_windows(config: &dyn ConfigPort) -> Result<(), MeanrevError> {
    if config.get_int("strategy", "window", 20) < 2 {
        return Err(MeanrevError::invalid(
            "strategy",
            "window",
            "window must be at least 2",
        ));
    }
    if config.get_int("strategy", "bandwidth_window", 125) < 1 {
        return Err(MeanrevError::invalid(
            "strategy",
            "bandwidth_window",
            "bandwidth_window must be at least 1",
        ));
    }
    if config.get_int("strategy", "squeeze_lookback", 5) < 1 {
        return Err(MeanrevError::invalid(
            "strategy",
            "squeeze_lookback",
            "squeeze_lookback must be at least 1",
        ));
    }
    Ok(())
}

fn validate_band_factors(config: &dyn ConfigPort) -> Result<(), MeanrevError> {
    for (key, default) in [
        ("width", 2.0),
        ("squeeze_factor", 1.1),
        ("expansion_factor", 0.8),
    ] {
        let value = config.get_double("strategy", key, default);
        if !(value.is_finite() && value > 0.0) {
            return Err(MeanrevError::invalid(
                "strategy",
                key,
                format!("{key} must be positive"),
            ));
        }
    }
    Ok(())
}

fn validate_thresholds(config: &dyn ConfigPort) -> Result<(), MeanrevError> {
    let upper = config.get_double("strategy", "perc_b_upper_threshold", 1.0);
    let lower = config.get_double("strategy", "perc_b_lower_threshold", 0.0);
    if lower >= upper {
        return Err(MeanrevError::invalid(
            "strategy",
            "perc_b_lower_threshold",
            "perc_b_lower_threshold must be below perc_b_upper_threshold",
        ));
    }
    Ok(())
}

fn validate_stop_loss(config: &dyn ConfigPort) -> Result<(), MeanrevError> {
    ensure_bool(config, "strategy", "stop_loss")?;
    if !config.get_bool("strategy", "stop_loss", false) {
        return Ok(());
    }
    let perc = config.get_double("strategy", "stop_loss_perc", 0.1);
    if !(perc > 0.0 && perc < 1.0) {
        return Err(MeanrevError::invalid(
            "strategy",
            "stop_loss_perc",
            "stop_loss_perc must be between 0 and 1",
        ));
    }
    Ok(())
}
