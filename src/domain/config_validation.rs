//! Configuration validation.
//!
//! Validates all config fields before a run.

use crate::domain::analyzer::DEFAULT_RISK_FREE_RATE;
use crate::domain::broker::DEFAULT_COST_RATE;
use crate::domain::error::EquisimError;
use crate::domain::universe::Universe;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), EquisimError> {
    validate_initial_capital(config)?;
    validate_rate(config, "cost_rate", DEFAULT_COST_RATE)?;
    validate_rate(config, "risk_free_rate", DEFAULT_RISK_FREE_RATE)?;
    validate_dates(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), EquisimError> {
    if let Some(dir) = config.get_string("data", "cache_dir") {
        if dir.trim().is_empty() {
            return Err(EquisimError::ConfigInvalid {
                section: "data".to_string(),
                key: "cache_dir".to_string(),
                reason: "cache_dir must not be empty".to_string(),
            });
        }
    }
    if let Some(name) = config.get_string("universe", "name") {
        Universe::parse(&name).map_err(|e| EquisimError::ConfigInvalid {
            section: "universe".to_string(),
            key: "name".to_string(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), EquisimError> {
    let value = config.get_double("backtest", "initial_capital", 0.0);
    if value <= 0.0 {
        return Err(EquisimError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "initial_capital".to_string(),
            reason: "initial_capital must be positive".to_string(),
        });
    }
    Ok(())
}

/// Read a `[backtest]` rate, falling back to `default` when the key is
/// absent. A value that is present but not a number is an error.
pub fn parse_rate(config: &dyn ConfigPort, key: &str, default: f64) -> Result<f64, EquisimError> {
    match config.get_string("backtest", key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse::<f64>()
                .map_err(|_| EquisimError::ConfigInvalid {
                    section: "backtest".to_string(),
                    key: key.to_string(),
                    reason: format!("'{raw}' is not a number"),
                })
        }
        _ => Ok(default),
    }
}

fn validate_rate(config: &dyn ConfigPort, key: &str, default: f64) -> Result<(), EquisimError> {
    let value = parse_rate(config, key, default)?;
    if !(0.0..1.0).contains(&value) {
        return Err(EquisimError::ConfigInvalid {
            section: "backtest".to_string(),
            key: key.to_string(),
            reason: format!("{key} must be between 0 and 1"),
        });
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), EquisimError> {
    let start_str = config.get_string("backtest", "start_date");
    let end_str = config.get_string("backtest", "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    if start_date >= end_date {
        return Err(EquisimError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "start_date".to_string(),
            reason: "start_date must be before end_date".to_string(),
        });
    }
    Ok(())
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, EquisimError> {
    match value {
        None => Err(EquisimError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            EquisimError::ConfigInvalid {
                section: "backtest".to_string(),
                key: field.to_string(),
                reason: format!("invalid {} format, expected YYYY-MM-DD", field),
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const DATES: &str = "start_date = 2020-01-01\nend_date = 2024-12-31\n";

    #[test]
    fn valid_backtest_config_passes() {
        let config = make_config(
            r#"
[backtest]
initial_capital = 1000000
cost_rate = 0.00119
risk_free_rate = 0.05
start_date = 2020-01-01
end_date = 2024-12-31
benchmark = ^NSEI
"#,
        );
        assert!(validate_backtest_config(&config).is_ok());
    }

    #[test]
    fn rates_default_when_absent() {
        let config = make_config(&format!("[backtest]\ninitial_capital = 100\n{DATES}"));
        assert!(validate_backtest_config(&config).is_ok());
    }

    #[test]
    fn initial_capital_must_be_positive() {
        for capital in ["-100", "0"] {
            let config =
                make_config(&format!("[backtest]\ninitial_capital = {capital}\n{DATES}"));
            let err = validate_backtest_config(&config).unwrap_err();
            assert!(
                matches!(err, EquisimError::ConfigInvalid { key, .. } if key == "initial_capital")
            );
        }
    }

    #[test]
    fn cost_rate_out_of_range_fails() {
        for rate in ["-0.001", "1.0"] {
            let config = make_config(&format!(
                "[backtest]\ninitial_capital = 100\ncost_rate = {rate}\n{DATES}"
            ));
            let err = validate_backtest_config(&config).unwrap_err();
            assert!(matches!(err, EquisimError::ConfigInvalid { key, .. } if key == "cost_rate"));
        }
    }

    #[test]
    fn malformed_rate_fails() {
        let config = make_config(&format!(
            "[backtest]\ninitial_capital = 100\ncost_rate = 0,5\n{DATES}"
        ));
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, EquisimError::ConfigInvalid { key, .. } if key == "cost_rate"));

        let config = make_config("[backtest]\nrisk_free_rate = abc\n");
        assert!(parse_rate(&config, "risk_free_rate", 0.05).is_err());
        let config = make_config("[backtest]\n");
        assert_eq!(parse_rate(&config, "risk_free_rate", 0.05).unwrap(), 0.05);
    }

    #[test]
    fn risk_free_rate_out_of_range_fails() {
        let config = make_config(&format!(
            "[backtest]\ninitial_capital = 100\nrisk_free_rate = 1.5\n{DATES}"
        ));
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(
            matches!(err, EquisimError::ConfigInvalid { key, .. } if key == "risk_free_rate")
        );
    }

    #[test]
    fn invalid_start_date_format_fails() {
        let config = make_config(
            "[backtest]\ninitial_capital = 100\nstart_date = 2020/01/01\nend_date = 2024-12-31\n",
        );
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, EquisimError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn missing_end_date_fails() {
        let config = make_config("[backtest]\ninitial_capital = 100\nstart_date = 2020-01-01\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, EquisimError::ConfigMissing { key, .. } if key == "end_date"));
    }

    #[test]
    fn start_date_after_end_date_fails() {
        let config = make_config(
            "[backtest]\ninitial_capital = 100\nstart_date = 2024-12-31\nend_date = 2020-01-01\n",
        );
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, EquisimError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn data_config_accepts_defaults() {
        let config = make_config("[backtest]\ninitial_capital = 100\n");
        assert!(validate_data_config(&config).is_ok());
    }

    #[test]
    fn malformed_universe_name_fails() {
        let config = make_config("[universe]\nname = sensex30\n");
        let err = validate_data_config(&config).unwrap_err();
        assert!(matches!(err, EquisimError::ConfigInvalid { section, .. } if section == "universe"));
    }
}
