//! Domain error types.

/// Top-level error type for meanrev.
#[derive(Debug, thiserror::Error)]
pub enum MeanrevError {
    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("no instruments left to backtest")]
    EmptyPortfolio,

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error("sampler error: {reason}")]
    Sampler { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MeanrevError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        MeanrevError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&MeanrevError> for std::process::ExitCode {
    fn from(err: &MeanrevError) -> Self {
        let code: u8 = match err {
            MeanrevError::Io(_)
            | MeanrevError::Report { .. }
            | MeanrevError::Sampler { .. } => 1,
            MeanrevError::ConfigParse { .. }
            | MeanrevError::ConfigMissing { .. }
            | MeanrevError::ConfigInvalid { .. } => 2,
            MeanrevError::Data { .. } => 3,
            MeanrevError::NoData { .. }
            | MeanrevError::InsufficientData { .. }
            | MeanrevError::EmptyPortfolio => 5,
        };
        std::process::ExitCode::from(code)
    }
}
