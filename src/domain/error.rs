//! Domain error types.

/// Top-level error type for equisim.
#[derive(Debug, thiserror::Error)]
pub enum EquisimError {
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

    #[error(transparent)]
    Universe(#[from] crate::domain::universe::UniverseError),

    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("price data error for {symbol}: {reason}")]
    PriceData { symbol: String, reason: String },

    #[error("invalid series: {reason}")]
    InvalidSeries { reason: String },

    #[error("no price data for {symbol}")]
    NoData { symbol: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&EquisimError> for std::process::ExitCode {
    fn from(err: &EquisimError) -> Self {
        let code: u8 = match err {
            EquisimError::Io(_) | EquisimError::Csv(_) => 1,
            EquisimError::ConfigParse { .. }
            | EquisimError::ConfigMissing { .. }
            | EquisimError::ConfigInvalid { .. } => 2,
            EquisimError::Universe(_) | EquisimError::Fetch { .. } => 3,
            EquisimError::InvalidSeries { .. } => 4,
            EquisimError::PriceData { .. } | EquisimError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::universe::UniverseError;

    #[test]
    fn config_errors_display_section_and_key() {
        let err = EquisimError::ConfigInvalid {
            section: "backtest".into(),
            key: "cost_rate".into(),
            reason: "cost_rate must be between 0 and 1".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value [backtest] cost_rate: cost_rate must be between 0 and 1"
        );
    }

    #[test]
    fn universe_error_is_transparent() {
        let err: EquisimError = UniverseError::InvalidName("sp500".into()).into();
        assert_eq!(
            err.to_string(),
            "universe format should be like 'nifty100', 'nifty500': got 'sp500'"
        );
    }

    #[test]
    fn exit_codes_group_by_category() {
        let config = EquisimError::ConfigMissing {
            section: "backtest".into(),
            key: "initial_capital".into(),
        };
        let fetch = EquisimError::Fetch {
            url: "https://example.invalid".into(),
            reason: "HTTP 404".into(),
        };
        // ExitCode has no PartialEq; compare the Debug form
        assert_eq!(
            format!("{:?}", std::process::ExitCode::from(&config)),
            format!("{:?}", std::process::ExitCode::from(2))
        );
        assert_eq!(
            format!("{:?}", std::process::ExitCode::from(&fetch)),
            format!("{:?}", std::process::ExitCode::from(3))
        );
    }
}
