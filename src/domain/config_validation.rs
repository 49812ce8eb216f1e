//! Configuration validation.
//!
//! Runs before any bar is loaded. Every check reads through [`ConfigPort`] with the same
//! defaults the CLI uses to build [`TurtleConfig`](super::strategy::TurtleConfig), so a
//! config that passes here builds without surprises.

use crate::domain::error::TurtleError;
use crate::domain::intent::SystemId;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

/// Allocations must sum to one within this tolerance.
const ALLOCATION_TOLERANCE: f64 = 1e-9;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> TurtleError {
    TurtleError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

pub fn system_defaults(id: SystemId) -> (i64, i64) {
    match id {
        SystemId::System1 => (20, 10),
        SystemId::System2 => (55, 20),
    }
}

pub fn validate_turtle_config(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    let mut allocation_sum = 0.0;
    for id in SystemId::ALL {
        allocation_sum += validate_system(config, id)?;
    }
    if (allocation_sum - 1.0).abs() > ALLOCATION_TOLERANCE {
        return Err(invalid(
            "system2",
            "allocation",
            format!("system allocations must sum to 1, got {allocation_sum}"),
        ));
    }

    validate_positive_int(config, "turtle", "atr_period", 20)?;
    validate_positive_int(config, "turtle", "max_units", 4)?;

    let risk_ratio = config.get_double("turtle", "risk_ratio", 0.02)?;
    if !(risk_ratio > 0.0 && risk_ratio < 1.0) {
        return Err(invalid(
            "turtle",
            "risk_ratio",
            "risk_ratio must be between 0 and 1",
        ));
    }

    validate_positive_double(config, "turtle", "unit_gap", 0.5)?;
    validate_positive_double(config, "turtle", "stop_atr_multiple", 2.0)?;
    validate_positive_double(config, "turtle", "min_price_move_fraction", 0.01)?;
    validate_positive_double(config, "turtle", "lot_size", 0.001)?;
    Ok(())
}

pub fn validate_account_config(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    let equity = config.get_double("account", "initial_equity", 100_000.0)?;
    if !(equity.is_finite() && equity > 0.0) {
        return Err(invalid(
            "account",
            "initial_equity",
            "initial_equity must be positive",
        ));
    }
    for key in ["commission_pct", "slippage_pct"] {
        let default = if key == "commission_pct" { 0.1 } else { 0.0 };
        let value = config.get_double("account", key, default)?;
        if !(value.is_finite() && value >= 0.0) {
            return Err(invalid("account", key, format!("{key} must be non-negative")));
        }
    }
    Ok(())
}

/// Date bounds from `[data]`, both optional. Returns them parsed so callers do not re-parse.
pub fn validate_data_range(
    config: &dyn ConfigPort,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>), TurtleError> {
    let start = parse_date(config, "start_date")?;
    let end = parse_date(config, "end_date")?;
    if let (Some(s), Some(e)) = (start, end)
        && s > e
    {
        return Err(invalid(
            "data",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    Ok((start, end))
}

fn parse_date(config: &dyn ConfigPort, key: &str) -> Result<Option<NaiveDate>, TurtleError> {
    config
        .get_string("data", key)
        .map(|s| {
            NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|_| {
                invalid(
                    "data",
                    key,
                    format!("invalid {key} '{s}', expected YYYY-MM-DD"),
                )
            })
        })
        .transpose()
}

fn validate_system(config: &dyn ConfigPort, id: SystemId) -> Result<f64, TurtleError> {
    let section = id.to_string();
    let (entry_default, exit_default) = system_defaults(id);
    validate_positive_int(config, &section, "entry_period", entry_default)?;
    validate_positive_int(config, &section, "exit_period", exit_default)?;

    let allocation = config.get_double(&section, "allocation", 0.5)?;
    if !(0.0..=1.0).contains(&allocation) {
        return Err(invalid(
            &section,
            "allocation",
            "allocation must be between 0 and 1",
        ));
    }
    Ok(allocation)
}

fn validate_positive_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<(), TurtleError> {
    if config.get_int(section, key, default)? < 1 {
        return Err(invalid(section, key, format!("{key} must be at least 1")));
    }
    Ok(())
}

fn validate_positive_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<(), TurtleError> {
    let value = config.get_double(section, key, default)?;
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid(section, key, format!("{key} must be positive")));
    }
    Ok(())
}
